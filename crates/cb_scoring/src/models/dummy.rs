use std::fmt;

use async_trait::async_trait;

use cb_core::{Article, RelevanceAssessment, Result, ScoringModel, WeekWindow};

use crate::keyword::keyword_assessment;
use crate::newsletter::render_template;

/// Keyless model for local runs and tests: deterministic keyword scoring
/// dressed up as a model, and template-rendered prose.
pub struct DummyModel;

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

#[async_trait]
impl ScoringModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn assess_article(&self, article: &Article) -> Result<RelevanceAssessment> {
        let mut assessment = keyword_assessment(article);
        assessment.reasoning = format!("Dummy model: {}", assessment.reasoning);
        Ok(assessment)
    }

    async fn compose_newsletter(
        &self,
        articles: &[Article],
        window: &WeekWindow,
    ) -> Result<String> {
        Ok(render_template(articles, window))
    }
}
