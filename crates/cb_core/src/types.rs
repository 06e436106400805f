use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One ingested news item.
///
/// Identity is the `link`, with the feed-provided `guid` as an alternate
/// key: a stored article matches an incoming one when either field is equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub link: String,
    pub guid: Option<String>,
    pub title: String,
    pub description: String,
    pub content: Option<String>,
    pub pub_date: DateTime<Utc>,
    pub creator: String,
    pub categories: Vec<String>,
    pub image_url: Option<String>,
    pub source_name: String,
    pub source_url: String,

    // Scoring attributes, filled in by the relevance scorer.
    pub relevance_score: f64,
    pub student_priority: bool,
    pub ai_reasoning: String,
    pub ai_categories: Vec<String>,
    pub ai_scored: bool,
    pub scoring_error: bool,

    // Pipeline attributes.
    /// UTC calendar day on which this article was ingested.
    pub fetch_date: NaiveDate,
    /// 1-based position among the day's articles, None until ranked.
    pub daily_rank: Option<u32>,
}

impl Article {
    /// Identity match against another link/guid pair.
    pub fn matches_identity(&self, link: &str, guid: Option<&str>) -> bool {
        if self.link == link {
            return true;
        }
        match (self.guid.as_deref(), guid) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Outcome of an upsert against the article store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleStatus {
    New,
    Updated,
    Unchanged,
}

/// One finalized newsletter, keyed by (week_number, year).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterEntry {
    pub week_number: u32,
    pub year: i32,
    pub title: String,
    /// Generated prose, Markdown.
    pub content: String,
    pub html_content: String,
    pub date_range: String,
    pub article_count: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

/// Persisted status of one trigger invocation, so job state survives
/// process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn pending(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn complete(mut self, result: serde_json::Value, now: DateTime<Utc>) -> Self {
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.updated_at = now;
        self
    }

    pub fn fail(mut self, error: String, now: DateTime<Utc>) -> Self {
        self.status = JobStatus::Failed;
        self.error = Some(error);
        self.updated_at = now;
        self
    }
}
