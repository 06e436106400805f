use std::sync::Arc;

use chrono::{Datelike, Timelike, Weekday};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use cb_core::{Clock, SystemClock, WeekWindow};

use crate::daily::DailyRanker;
use crate::ingest::IngestManager;
use crate::weekly::WeeklyAggregator;

/// Time windows during which a trigger is allowed to start work.
///
/// The windows are deliberately wider than a single minute: an external
/// trigger that arrives a few minutes late must still land inside its slot.
#[derive(Debug, Clone)]
pub struct TriggerConfig {
    /// UTC hours at which a daily ingest-and-rank pass may start.
    pub daily_hours: Vec<u32>,
    /// Minutes past each daily hour during which the pass may still start.
    pub daily_window_minutes: u32,
    pub weekly_weekday: Weekday,
    pub weekly_hour: u32,
    /// The weekly pass runs from this minute to the end of the hour.
    pub weekly_from_minute: u32,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            daily_hours: vec![6, 12, 18],
            daily_window_minutes: 30,
            weekly_weekday: Weekday::Sun,
            weekly_hour: 23,
            weekly_from_minute: 45,
        }
    }
}

impl TriggerConfig {
    fn daily_due(&self, hour: u32, minute: u32) -> bool {
        self.daily_hours.contains(&hour) && minute < self.daily_window_minutes
    }

    fn weekly_due(&self, weekday: Weekday, hour: u32, minute: u32) -> bool {
        weekday == self.weekly_weekday && hour == self.weekly_hour && minute >= self.weekly_from_minute
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: String,
    pub success: bool,
    pub detail: serde_json::Value,
}

/// What one trigger evaluation did. An empty `stages` list means the
/// timestamp fell outside every window and nothing ran.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerReport {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub weekday: String,
    pub hour: u32,
    pub minute: u32,
    pub stages: Vec<StageReport>,
}

/// Evaluates the current time against the configured windows and runs
/// whichever pipeline stages are due. A stage failure is recorded in the
/// report instead of propagated, so the trigger itself never errors.
pub struct Scheduler {
    ingest: IngestManager,
    ranker: DailyRanker,
    aggregator: WeeklyAggregator,
    clock: Arc<dyn Clock>,
    config: TriggerConfig,
}

impl Scheduler {
    pub fn new(ingest: IngestManager, ranker: DailyRanker, aggregator: WeeklyAggregator) -> Self {
        Self::with_clock(ingest, ranker, aggregator, Arc::new(SystemClock), TriggerConfig::default())
    }

    pub fn with_clock(
        ingest: IngestManager,
        ranker: DailyRanker,
        aggregator: WeeklyAggregator,
        clock: Arc<dyn Clock>,
        config: TriggerConfig,
    ) -> Self {
        Self {
            ingest,
            ranker,
            aggregator,
            clock,
            config,
        }
    }

    pub async fn tick(&self) -> TriggerReport {
        let now = self.clock.now_utc();
        let (weekday, hour, minute) = (now.weekday(), now.hour(), now.minute());
        let mut stages = Vec::new();

        if self.config.daily_due(hour, minute) {
            info!("⏰ Daily window open at {}:{:02}, running ingest", hour, minute);
            let ingest_ok = match self.ingest.run(false).await {
                Ok(summary) => {
                    stages.push(StageReport {
                        stage: "ingest".to_string(),
                        success: true,
                        detail: serde_json::to_value(&summary).unwrap_or(serde_json::Value::Null),
                    });
                    true
                }
                Err(e) => {
                    warn!("⏰ Ingest stage failed: {}", e);
                    stages.push(StageReport {
                        stage: "ingest".to_string(),
                        success: false,
                        detail: json!({ "error": e.to_string() }),
                    });
                    false
                }
            };

            // Ranking a day whose ingest just failed would freeze a stale
            // ordering, so the stage only runs after a successful ingest.
            if ingest_ok {
                match self.ranker.rank_day(now.date_naive(), None).await {
                    Ok(summary) => stages.push(StageReport {
                        stage: "rank".to_string(),
                        success: true,
                        detail: serde_json::to_value(&summary).unwrap_or(serde_json::Value::Null),
                    }),
                    Err(e) => {
                        warn!("⏰ Ranking stage failed: {}", e);
                        stages.push(StageReport {
                            stage: "rank".to_string(),
                            success: false,
                            detail: json!({ "error": e.to_string() }),
                        });
                    }
                }
            }
        }

        if self.config.weekly_due(weekday, hour, minute) {
            let window = WeekWindow::for_date(now.date_naive());
            info!("⏰ Weekly window open, aggregating week {}/{}", window.week, window.year);
            match self.aggregator.aggregate_week(window.week, window.year).await {
                Ok(outcome) => stages.push(StageReport {
                    stage: "aggregate".to_string(),
                    success: true,
                    detail: json!({
                        "week": outcome.entry.week_number,
                        "year": outcome.entry.year,
                        "article_count": outcome.entry.article_count,
                        "already_existed": outcome.already_existed,
                        "ai_generated": outcome.ai_generated,
                    }),
                }),
                Err(e) => {
                    warn!("⏰ Aggregation stage failed: {}", e);
                    stages.push(StageReport {
                        stage: "aggregate".to_string(),
                        success: false,
                        detail: json!({ "error": e.to_string() }),
                    });
                }
            }
        }

        if stages.is_empty() {
            info!("⏰ Trigger at {} {}:{:02} fell outside every window", weekday, hour, minute);
        }

        TriggerReport {
            timestamp: now,
            weekday: weekday.to_string(),
            hour,
            minute,
            stages,
        }
    }
}
