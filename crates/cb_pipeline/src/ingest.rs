use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use cb_core::{Article, ArticleStatus, ArticleStore, Clock, Result, SystemClock};
use cb_feeds::{FeedFetcher, FeedSource};
use cb_scoring::RelevanceScorer;

/// Counters for one ingest run, so operators can tell "nothing new" apart
/// from "something broke".
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub fetch_date: NaiveDate,
    pub sources_processed: usize,
    pub sources_failed: usize,
    pub articles_fetched: usize,
    pub articles_new: usize,
    pub articles_updated: usize,
    pub articles_skipped: usize,
    pub ai_scored: usize,
    pub fallback_scored: usize,
    pub scoring_errors: usize,
    pub high_priority: usize,
}

impl IngestSummary {
    fn new(fetch_date: NaiveDate) -> Self {
        Self {
            fetch_date,
            sources_processed: 0,
            sources_failed: 0,
            articles_fetched: 0,
            articles_new: 0,
            articles_updated: 0,
            articles_skipped: 0,
            ai_scored: 0,
            fallback_scored: 0,
            scoring_errors: 0,
            high_priority: 0,
        }
    }
}

struct ArticleOutcome {
    status: ArticleStatus,
    scored: bool,
    ai_scored: bool,
    scoring_error: bool,
    high_priority: bool,
}

/// Runs the daily ingestion: fetch every configured feed, score the new
/// articles, store them. One bad source never aborts the run; storage
/// failures do.
pub struct IngestManager {
    store: Arc<dyn ArticleStore>,
    scorer: RelevanceScorer,
    fetcher: FeedFetcher,
    feeds: Vec<FeedSource>,
    clock: Arc<dyn Clock>,
}

impl IngestManager {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        scorer: RelevanceScorer,
        feeds: Vec<FeedSource>,
    ) -> Self {
        Self::with_clock(store, scorer, feeds, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn ArticleStore>,
        scorer: RelevanceScorer,
        feeds: Vec<FeedSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            scorer,
            fetcher: FeedFetcher::new(),
            feeds,
            clock,
        }
    }

    pub async fn run(&self, force_refresh: bool) -> Result<IngestSummary> {
        let fetch_date = self.clock.now_utc().date_naive();
        let mut summary = IngestSummary::new(fetch_date);

        for feed in &self.feeds {
            match self.fetcher.fetch(feed, fetch_date).await {
                Ok(articles) => {
                    summary.sources_processed += 1;
                    self.ingest_batch(articles, force_refresh, &mut summary)
                        .await?;
                }
                Err(e) => {
                    warn!("📡 Skipping source {}: {}", feed.name, e);
                    summary.sources_failed += 1;
                }
            }
        }

        info!(
            "✅ Ingest for {}: {} new, {} updated, {} skipped ({} AI-scored, {} fallback, {} high priority)",
            summary.fetch_date,
            summary.articles_new,
            summary.articles_updated,
            summary.articles_skipped,
            summary.ai_scored,
            summary.fallback_scored,
            summary.high_priority
        );
        Ok(summary)
    }

    /// Score and store one batch of normalized articles. Public so a batch
    /// from any origin can be pushed through the same path.
    pub async fn ingest_batch(
        &self,
        articles: Vec<Article>,
        force_refresh: bool,
        summary: &mut IngestSummary,
    ) -> Result<()> {
        summary.articles_fetched += articles.len();

        let outcomes = join_all(
            articles
                .into_iter()
                .map(|article| self.process_article(article, force_refresh)),
        )
        .await;

        for outcome in outcomes {
            let outcome = outcome?;
            match outcome.status {
                ArticleStatus::New => summary.articles_new += 1,
                ArticleStatus::Updated => summary.articles_updated += 1,
                ArticleStatus::Unchanged => summary.articles_skipped += 1,
            }
            if outcome.scored {
                if outcome.ai_scored {
                    summary.ai_scored += 1;
                } else {
                    summary.fallback_scored += 1;
                }
                if outcome.scoring_error {
                    summary.scoring_errors += 1;
                }
                if outcome.high_priority {
                    summary.high_priority += 1;
                }
            }
        }
        Ok(())
    }

    async fn process_article(
        &self,
        mut article: Article,
        force_refresh: bool,
    ) -> Result<ArticleOutcome> {
        // Skip the scoring call for articles we already hold, so re-runs
        // within the same window stay cheap and idempotent.
        if !force_refresh
            && self
                .store
                .find_article(&article.link, article.guid.as_deref())
                .await?
                .is_some()
        {
            return Ok(ArticleOutcome {
                status: ArticleStatus::Unchanged,
                scored: false,
                ai_scored: false,
                scoring_error: false,
                high_priority: false,
            });
        }

        let score = self.scorer.score(&article).await;
        score.apply_to(&mut article);

        let status = self.store.upsert_article(&article, force_refresh).await?;
        Ok(ArticleOutcome {
            status,
            scored: true,
            ai_scored: score.ai_scored,
            scoring_error: score.scoring_error,
            high_priority: article.student_priority,
        })
    }
}
