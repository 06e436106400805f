use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::warn;

use cb_core::{Article, RelevanceAssessment, ScoringModel};

use crate::keyword::keyword_assessment;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONCURRENCY: usize = 4;

/// Result of scoring one article. `ai_scored` and `scoring_error` are never
/// both true: an article either got an AI assessment or it did not.
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub assessment: RelevanceAssessment,
    pub ai_scored: bool,
    pub scoring_error: bool,
}

impl ScoreOutcome {
    /// Write this outcome onto the article's scoring fields.
    pub fn apply_to(&self, article: &mut Article) {
        article.relevance_score = self.assessment.score;
        article.student_priority = self.assessment.student_priority;
        article.ai_reasoning = self.assessment.reasoning.clone();
        article.ai_categories = self.assessment.categories.clone();
        article.ai_scored = self.ai_scored;
        article.scoring_error = self.scoring_error;
    }
}

/// Scores articles through the configured model, falling back to the
/// deterministic keyword path so the pipeline always makes progress.
pub struct RelevanceScorer {
    model: Option<Arc<dyn ScoringModel>>,
    timeout: Duration,
    semaphore: Arc<Semaphore>,
}

impl RelevanceScorer {
    pub fn new(model: Option<Arc<dyn ScoringModel>>) -> Self {
        Self::with_limits(model, DEFAULT_TIMEOUT, DEFAULT_CONCURRENCY)
    }

    /// The concurrency cap bounds parallel model calls against provider
    /// rate limits; the timeout keeps a stuck call from blocking the run.
    pub fn with_limits(
        model: Option<Arc<dyn ScoringModel>>,
        timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            model,
            timeout,
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    /// Score one article. Infallible: any model failure degrades to the
    /// keyword fallback instead of erroring the batch.
    pub async fn score(&self, article: &Article) -> ScoreOutcome {
        let model = match &self.model {
            Some(model) => model,
            None => {
                // AI scoring disabled by configuration: fallback, not an error.
                return ScoreOutcome {
                    assessment: keyword_assessment(article),
                    ai_scored: false,
                    scoring_error: false,
                };
            }
        };

        let attempt = async {
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|e| cb_core::Error::Scoring(e.to_string()))?;
            model.assess_article(article).await
        };

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(assessment)) => ScoreOutcome {
                assessment: assessment.clamped(),
                ai_scored: true,
                scoring_error: false,
            },
            Ok(Err(e)) => {
                warn!("AI scoring failed for '{}': {}", article.title, e);
                ScoreOutcome {
                    assessment: keyword_assessment(article),
                    ai_scored: false,
                    scoring_error: true,
                }
            }
            Err(_) => {
                warn!(
                    "AI scoring timed out after {:?} for '{}'",
                    self.timeout, article.title
                );
                ScoreOutcome {
                    assessment: keyword_assessment(article),
                    ai_scored: false,
                    scoring_error: true,
                }
            }
        }
    }
}
