use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use tracing::info;

use cb_core::{Result, WeekWindow};
use cb_feeds::default_feeds;
use cb_pipeline::{DailyRanker, IngestManager, Scheduler, WeeklyAggregator};
use cb_scoring::models::create_model;
use cb_scoring::{NewsletterComposer, RelevanceScorer};
use cb_storage::{create_storage, Storage};
use cb_web::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(long, default_value = "memory", help = "Storage backend: memory or sqlite")]
    storage: String,
    #[arg(long, help = "Database file path for the sqlite backend")]
    db_path: Option<String>,
    #[arg(
        long,
        default_value = "none",
        help = "Model to use for scoring. Available models: none (keyword fallback only), dummy, gemini, mistral"
    )]
    model: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Fetch all configured feeds, score the articles and store them.
    Ingest {
        /// Re-score and update articles that are already stored.
        #[arg(long)]
        force: bool,
    },
    /// Recompute the daily ranking for one day.
    RankDay {
        /// Day to rank (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Restrict the ranking to one source.
        #[arg(long)]
        source: Option<String>,
    },
    /// Aggregate a week's top articles into an archived newsletter.
    AggregateWeek {
        /// ISO week number. Defaults to the current week.
        #[arg(long)]
        week: Option<u32>,
        /// ISO week-based year. Defaults to the current year.
        #[arg(long)]
        year: Option<i32>,
    },
    /// Evaluate the trigger windows once and run whatever stages are due.
    Trigger,
    /// Run the HTTP API.
    Serve {
        #[arg(long, default_value = "3000")]
        port: u16,
    },
    /// List the configured feed sources.
    Feeds,
}

fn api_key_for(model: &str) -> Option<String> {
    match model {
        "gemini" => std::env::var("GEMINI_API_KEY").ok(),
        "mistral" => std::env::var("MISTRAL_API_KEY").ok(),
        _ => None,
    }
}

struct Pipeline {
    ingest: IngestManager,
    ranker: DailyRanker,
    aggregator: WeeklyAggregator,
}

fn build_pipeline(storage: &Arc<dyn Storage>, model_name: &str) -> Result<Pipeline> {
    let model = create_model(model_name, api_key_for(model_name))?;
    let store: Arc<dyn cb_core::ArticleStore> = storage.clone();
    let archive: Arc<dyn cb_core::NewsletterArchive> = storage.clone();

    Ok(Pipeline {
        ingest: IngestManager::new(
            store.clone(),
            RelevanceScorer::new(model.clone()),
            default_feeds(),
        ),
        ranker: DailyRanker::new(store.clone()),
        aggregator: WeeklyAggregator::new(store, archive, NewsletterComposer::new(model)),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let storage = create_storage(cli.storage.as_str(), cli.db_path.as_deref()).await?;
    info!("💾 Storage initialized (using {})", cli.storage);

    let pipeline = build_pipeline(&storage, cli.model.as_str())?;
    info!("🧠 Scoring model: {}", cli.model);

    match cli.command {
        Commands::Ingest { force } => {
            let summary = pipeline.ingest.run(force).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::RankDay { date, source } => {
            let date = date.unwrap_or_else(|| chrono::Utc::now().date_naive());
            let summary = pipeline.ranker.rank_day(date, source.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::AggregateWeek { week, year } => {
            let current = WeekWindow::for_date(chrono::Utc::now().date_naive());
            let outcome = pipeline
                .aggregator
                .aggregate_week(week.unwrap_or(current.week), year.unwrap_or(current.year))
                .await?;
            if outcome.already_existed {
                info!(
                    "📦 Week {}/{} was already archived",
                    outcome.entry.week_number, outcome.entry.year
                );
            }
            println!("{}", outcome.entry.content);
        }
        Commands::Trigger => {
            let scheduler = Scheduler::new(pipeline.ingest, pipeline.ranker, pipeline.aggregator);
            let report = scheduler.tick().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Serve { port } => {
            let scheduler = Scheduler::new(pipeline.ingest, pipeline.ranker, pipeline.aggregator);
            let state = AppState {
                scheduler: Arc::new(scheduler),
                store: storage.clone(),
                archive: storage.clone(),
                jobs: storage,
                clock: Arc::new(cb_core::SystemClock),
            };
            cb_web::serve(state, port).await?;
        }
        Commands::Feeds => {
            for feed in default_feeds() {
                println!("{}\t{}", feed.name, feed.url);
            }
        }
    }

    Ok(())
}
