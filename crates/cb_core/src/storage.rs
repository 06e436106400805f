use async_trait::async_trait;
use chrono::NaiveDate;

use crate::types::{Article, ArticleStatus, JobRecord, NewsletterEntry};
use crate::Result;

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Look up a stored article by link or guid.
    async fn find_article(&self, link: &str, guid: Option<&str>) -> Result<Option<Article>>;

    /// Insert the article if absent; update its mutable fields in place when
    /// `force_refresh` is set. A matching stored article without the force
    /// flag is left untouched and reported as `Unchanged`.
    async fn upsert_article(&self, article: &Article, force_refresh: bool)
        -> Result<ArticleStatus>;

    /// All articles ingested on the given day, in insertion order,
    /// optionally scoped to one source.
    async fn get_by_fetch_date(
        &self,
        date: NaiveDate,
        source: Option<&str>,
    ) -> Result<Vec<Article>>;

    /// Overwrite the daily ranks for one day. Ranks for that day (and
    /// source, when scoped) are cleared first so a re-run never leaves
    /// stale positions behind.
    async fn assign_daily_ranks(
        &self,
        date: NaiveDate,
        source: Option<&str>,
        ranks: &[(String, u32)],
    ) -> Result<()>;

    /// Articles with a daily rank of at most `max_rank` whose fetch date
    /// falls within [start, end], in insertion order.
    async fn get_ranked_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        max_rank: u32,
    ) -> Result<Vec<Article>>;
}

#[async_trait]
pub trait NewsletterArchive: Send + Sync {
    async fn find_newsletter(&self, week: u32, year: i32) -> Result<Option<NewsletterEntry>>;

    /// Persist a finalized newsletter. Fails with `Error::DuplicateWeek`
    /// when an entry for the same (week, year) already exists, so a lost
    /// race never overwrites the winner.
    async fn save_newsletter(&self, entry: &NewsletterEntry) -> Result<NewsletterEntry>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn put_job(&self, job: &JobRecord) -> Result<()>;
    async fn get_job(&self, id: &str) -> Result<Option<JobRecord>>;
}
