use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use cb_core::{ArticleStore, Result};

#[derive(Debug, Clone, Serialize)]
pub struct RankSummary {
    pub date: NaiveDate,
    pub source: Option<String>,
    pub articles_ranked: usize,
}

/// Assigns each day's dense rank sequence. Rank is a total order over the
/// day's articles; the weekly stage filters on it later.
pub struct DailyRanker {
    store: Arc<dyn ArticleStore>,
}

impl DailyRanker {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// Recompute and overwrite all ranks for one day, optionally scoped to
    /// one source. The sort is stable, so equal scores keep their original
    /// insertion order and repeated runs over unchanged data reproduce the
    /// same ranking.
    pub async fn rank_day(&self, date: NaiveDate, source: Option<&str>) -> Result<RankSummary> {
        let mut articles = self.store.get_by_fetch_date(date, source).await?;
        articles.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

        let ranks: Vec<(String, u32)> = articles
            .iter()
            .enumerate()
            .map(|(i, article)| (article.link.clone(), (i + 1) as u32))
            .collect();

        self.store.assign_daily_ranks(date, source, &ranks).await?;

        info!("🏁 Ranked {} articles for {}", ranks.len(), date);
        Ok(RankSummary {
            date,
            source: source.map(|s| s.to_string()),
            articles_ranked: ranks.len(),
        })
    }
}
