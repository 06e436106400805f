pub mod daily;
pub mod ingest;
pub mod scheduler;
pub mod weekly;

pub use daily::{DailyRanker, RankSummary};
pub use ingest::{IngestManager, IngestSummary};
pub use scheduler::{Scheduler, StageReport, TriggerConfig, TriggerReport};
pub use weekly::{WeeklyAggregator, WeeklyOutcome};

pub mod prelude {
    pub use super::{
        DailyRanker, IngestManager, IngestSummary, RankSummary, Scheduler, TriggerConfig,
        TriggerReport, WeeklyAggregator, WeeklyOutcome,
    };
    pub use cb_core::{Clock, Error, Result, SystemClock};
}
