use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Article;
use crate::week::WeekWindow;
use crate::Result;

/// What a scoring model says about one article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceAssessment {
    /// Relevance to the student audience, 0-10.
    pub score: f64,
    pub student_priority: bool,
    pub reasoning: String,
    pub categories: Vec<String>,
}

impl RelevanceAssessment {
    /// Force the score into the valid range.
    pub fn clamped(mut self) -> Self {
        self.score = self.score.clamp(0.0, 10.0);
        self
    }
}

#[async_trait]
pub trait ScoringModel: Send + Sync {
    fn name(&self) -> &str;

    /// Classify one article's relevance to the student audience.
    async fn assess_article(&self, article: &Article) -> Result<RelevanceAssessment>;

    /// Compose the weekly newsletter prose (Markdown) from the final
    /// article selection.
    async fn compose_newsletter(
        &self,
        articles: &[Article],
        window: &WeekWindow,
    ) -> Result<String>;
}
