pub mod error;
pub mod models;
pub mod storage;
pub mod types;
pub mod week;

pub use error::Error;
pub use models::{RelevanceAssessment, ScoringModel};
pub use storage::{ArticleStore, JobStore, NewsletterArchive};
pub use types::{Article, ArticleStatus, JobRecord, JobStatus, NewsletterEntry};
pub use week::WeekWindow;

pub type Result<T> = std::result::Result<T, Error>;

/// Highest daily rank that still qualifies an article for the weekly pool.
pub const DAILY_TOP_CUTOFF: u32 = 10;

/// Number of articles kept in the final weekly selection.
pub const WEEKLY_SELECTION_SIZE: usize = 10;

/// Injected wall-clock source so time-gated logic stays testable.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> chrono::DateTime<chrono::Utc>;
}

/// Default clock reading the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now()
    }
}
