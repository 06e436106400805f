use std::sync::Arc;

use cb_core::{ArticleStore, Clock, JobStore, NewsletterArchive};
use cb_pipeline::Scheduler;

pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub store: Arc<dyn ArticleStore>,
    pub archive: Arc<dyn NewsletterArchive>,
    pub jobs: Arc<dyn JobStore>,
    pub clock: Arc<dyn Clock>,
}
