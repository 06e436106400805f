use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use cb_core::{
    Article, ArticleStatus, ArticleStore, Error, JobRecord, JobStore, NewsletterArchive,
    NewsletterEntry, Result,
};

/// In-memory backend. The single write lock is held across every
/// check-then-write sequence, so upserts and archive saves stay race-safe
/// without a storage-level constraint.
pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

#[derive(Default)]
struct MemoryStore {
    /// Articles in insertion order; the Vec index is the tie-break order.
    articles: Vec<Article>,
    newsletters: HashMap<(u32, i32), NewsletterEntry>,
    jobs: HashMap<String, JobRecord>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::default())),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy an incoming article's mutable fields onto a stored one, preserving
/// its identity, fetch date and any previously assigned rank.
fn apply_refresh(existing: &mut Article, incoming: &Article) {
    existing.title = incoming.title.clone();
    existing.description = incoming.description.clone();
    existing.content = incoming.content.clone();
    existing.pub_date = incoming.pub_date;
    existing.creator = incoming.creator.clone();
    existing.categories = incoming.categories.clone();
    existing.image_url = incoming.image_url.clone();
    existing.relevance_score = incoming.relevance_score;
    existing.student_priority = incoming.student_priority;
    existing.ai_reasoning = incoming.ai_reasoning.clone();
    existing.ai_categories = incoming.ai_categories.clone();
    existing.ai_scored = incoming.ai_scored;
    existing.scoring_error = incoming.scoring_error;
}

#[async_trait]
impl ArticleStore for MemoryStorage {
    async fn find_article(&self, link: &str, guid: Option<&str>) -> Result<Option<Article>> {
        let store = self.store.read().await;
        Ok(store
            .articles
            .iter()
            .find(|a| a.matches_identity(link, guid))
            .cloned())
    }

    async fn upsert_article(
        &self,
        article: &Article,
        force_refresh: bool,
    ) -> Result<ArticleStatus> {
        let mut store = self.store.write().await;
        if let Some(existing) = store
            .articles
            .iter_mut()
            .find(|a| a.matches_identity(&article.link, article.guid.as_deref()))
        {
            if force_refresh {
                apply_refresh(existing, article);
                return Ok(ArticleStatus::Updated);
            }
            return Ok(ArticleStatus::Unchanged);
        }
        store.articles.push(article.clone());
        Ok(ArticleStatus::New)
    }

    async fn get_by_fetch_date(
        &self,
        date: NaiveDate,
        source: Option<&str>,
    ) -> Result<Vec<Article>> {
        let store = self.store.read().await;
        Ok(store
            .articles
            .iter()
            .filter(|a| a.fetch_date == date)
            .filter(|a| source.map_or(true, |s| a.source_name == s))
            .cloned()
            .collect())
    }

    async fn assign_daily_ranks(
        &self,
        date: NaiveDate,
        source: Option<&str>,
        ranks: &[(String, u32)],
    ) -> Result<()> {
        let mut store = self.store.write().await;
        for article in store.articles.iter_mut() {
            if article.fetch_date == date && source.map_or(true, |s| article.source_name == s) {
                article.daily_rank = None;
            }
        }
        for (link, rank) in ranks {
            if let Some(article) = store.articles.iter_mut().find(|a| &a.link == link) {
                article.daily_rank = Some(*rank);
            }
        }
        Ok(())
    }

    async fn get_ranked_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        max_rank: u32,
    ) -> Result<Vec<Article>> {
        let store = self.store.read().await;
        Ok(store
            .articles
            .iter()
            .filter(|a| a.fetch_date >= start && a.fetch_date <= end)
            .filter(|a| a.daily_rank.is_some_and(|r| r <= max_rank))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl NewsletterArchive for MemoryStorage {
    async fn find_newsletter(&self, week: u32, year: i32) -> Result<Option<NewsletterEntry>> {
        let store = self.store.read().await;
        Ok(store.newsletters.get(&(week, year)).cloned())
    }

    async fn save_newsletter(&self, entry: &NewsletterEntry) -> Result<NewsletterEntry> {
        let mut store = self.store.write().await;
        let key = (entry.week_number, entry.year);
        if store.newsletters.contains_key(&key) {
            return Err(Error::DuplicateWeek {
                week: entry.week_number,
                year: entry.year,
            });
        }
        store.newsletters.insert(key, entry.clone());
        Ok(entry.clone())
    }
}

#[async_trait]
impl JobStore for MemoryStorage {
    async fn put_job(&self, job: &JobRecord) -> Result<()> {
        let mut store = self.store.write().await;
        store.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn get_job(&self, id: &str) -> Result<Option<JobRecord>> {
        let store = self.store.read().await;
        Ok(store.jobs.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(link: &str, guid: Option<&str>, date: NaiveDate, score: f64) -> Article {
        Article {
            link: link.to_string(),
            guid: guid.map(|g| g.to_string()),
            title: format!("Article {}", link),
            description: "desc".to_string(),
            content: None,
            pub_date: Utc::now(),
            creator: String::new(),
            categories: vec![],
            image_url: None,
            source_name: "test".to_string(),
            source_url: "http://example.com".to_string(),
            relevance_score: score,
            student_priority: false,
            ai_reasoning: String::new(),
            ai_categories: vec![],
            ai_scored: false,
            scoring_error: false,
            fetch_date: date,
            daily_rank: None,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[tokio::test]
    async fn upsert_is_idempotent_without_force() {
        let storage = MemoryStorage::new();
        let a = article("http://a/1", Some("g1"), day(), 5.0);

        assert_eq!(
            storage.upsert_article(&a, false).await.unwrap(),
            ArticleStatus::New
        );
        assert_eq!(
            storage.upsert_article(&a, false).await.unwrap(),
            ArticleStatus::Unchanged
        );
        let stored = storage.get_by_fetch_date(day(), None).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_is_detected_by_guid_alone() {
        let storage = MemoryStorage::new();
        let a = article("http://a/1", Some("g1"), day(), 5.0);
        let same_guid = article("http://mirror/1", Some("g1"), day(), 5.0);

        storage.upsert_article(&a, false).await.unwrap();
        assert_eq!(
            storage.upsert_article(&same_guid, false).await.unwrap(),
            ArticleStatus::Unchanged
        );
    }

    #[tokio::test]
    async fn force_refresh_updates_but_preserves_rank() {
        let storage = MemoryStorage::new();
        let a = article("http://a/1", None, day(), 5.0);
        storage.upsert_article(&a, false).await.unwrap();
        storage
            .assign_daily_ranks(day(), None, &[("http://a/1".to_string(), 1)])
            .await
            .unwrap();

        let mut refreshed = article("http://a/1", None, day(), 9.0);
        refreshed.title = "Updated title".to_string();
        assert_eq!(
            storage.upsert_article(&refreshed, true).await.unwrap(),
            ArticleStatus::Updated
        );

        let stored = storage.get_by_fetch_date(day(), None).await.unwrap();
        assert_eq!(stored[0].title, "Updated title");
        assert_eq!(stored[0].relevance_score, 9.0);
        assert_eq!(stored[0].daily_rank, Some(1));
    }

    #[tokio::test]
    async fn rank_assignment_clears_stale_ranks() {
        let storage = MemoryStorage::new();
        for i in 0..3 {
            let a = article(&format!("http://a/{}", i), None, day(), i as f64);
            storage.upsert_article(&a, false).await.unwrap();
        }
        storage
            .assign_daily_ranks(
                day(),
                None,
                &[
                    ("http://a/0".to_string(), 1),
                    ("http://a/1".to_string(), 2),
                    ("http://a/2".to_string(), 3),
                ],
            )
            .await
            .unwrap();

        // Re-rank with only two entries: the third must lose its rank.
        storage
            .assign_daily_ranks(
                day(),
                None,
                &[
                    ("http://a/2".to_string(), 1),
                    ("http://a/1".to_string(), 2),
                ],
            )
            .await
            .unwrap();

        let stored = storage.get_by_fetch_date(day(), None).await.unwrap();
        assert_eq!(stored[0].daily_rank, None);
        assert_eq!(stored[1].daily_rank, Some(2));
        assert_eq!(stored[2].daily_rank, Some(1));
    }

    #[tokio::test]
    async fn ranked_between_filters_by_rank_and_date() {
        let storage = MemoryStorage::new();
        let monday = day();
        let friday = NaiveDate::from_ymd_opt(2024, 3, 8).unwrap();
        let next_monday = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();

        for (i, date) in [(0, monday), (1, friday), (2, next_monday)] {
            let a = article(&format!("http://a/{}", i), None, date, 5.0);
            storage.upsert_article(&a, false).await.unwrap();
        }
        storage
            .assign_daily_ranks(monday, None, &[("http://a/0".to_string(), 11)])
            .await
            .unwrap();
        storage
            .assign_daily_ranks(friday, None, &[("http://a/1".to_string(), 3)])
            .await
            .unwrap();
        storage
            .assign_daily_ranks(next_monday, None, &[("http://a/2".to_string(), 1)])
            .await
            .unwrap();

        let sunday = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let ranked = storage.get_ranked_between(monday, sunday, 10).await.unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].link, "http://a/1");
    }

    #[tokio::test]
    async fn newsletter_archive_rejects_duplicates() {
        let storage = MemoryStorage::new();
        let entry = NewsletterEntry {
            week_number: 10,
            year: 2024,
            title: "Week 10".to_string(),
            content: "# Newsletter".to_string(),
            html_content: "<h1>Newsletter</h1>".to_string(),
            date_range: "Mar 4 - Mar 10, 2024".to_string(),
            article_count: 10,
            created_at: Utc::now(),
        };

        storage.save_newsletter(&entry).await.unwrap();
        let err = storage.save_newsletter(&entry).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateWeek { week: 10, year: 2024 }));

        let found = storage.find_newsletter(10, 2024).await.unwrap();
        assert!(found.is_some());
        assert!(storage.find_newsletter(11, 2024).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn job_records_round_trip() {
        let storage = MemoryStorage::new();
        let job = JobRecord::pending("job-1".to_string(), Utc::now());
        storage.put_job(&job).await.unwrap();

        let done = job
            .clone()
            .complete(serde_json::json!({"ok": true}), Utc::now());
        storage.put_job(&done).await.unwrap();

        let fetched = storage.get_job("job-1").await.unwrap().unwrap();
        assert_eq!(fetched.status, cb_core::JobStatus::Completed);
        assert!(storage.get_job("missing").await.unwrap().is_none());
    }
}
