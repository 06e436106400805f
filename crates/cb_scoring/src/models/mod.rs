use std::sync::Arc;

use cb_core::{Article, Error, Result, ScoringModel, WeekWindow};

pub mod dummy;
pub mod gemini;
pub mod mistral;

pub use dummy::DummyModel;
pub use gemini::GeminiModel;
pub use mistral::MistralModel;

/// Instantiate the configured scoring model. `none` disables AI scoring
/// entirely (keyword fallback only, no scoring errors reported).
pub fn create_model(name: &str, api_key: Option<String>) -> Result<Option<Arc<dyn ScoringModel>>> {
    match name {
        "none" => Ok(None),
        "dummy" => Ok(Some(Arc::new(DummyModel::new()))),
        "gemini" => Ok(Some(Arc::new(GeminiModel::new(api_key)?))),
        "mistral" => Ok(Some(Arc::new(MistralModel::new(api_key)?))),
        other => Err(Error::Scoring(format!("unknown scoring model: {}", other))),
    }
}

/// Shared prompt for the classification request.
pub(crate) fn assessment_prompt(article: &Article) -> String {
    let snippet: String = article
        .content
        .as_deref()
        .unwrap_or(&article.description)
        .chars()
        .take(1500)
        .collect();
    format!(
        "You assess news articles for a newsletter aimed at university students.\n\
         Rate the following article's relevance to students from 0 to 10 and reply \
         with JSON only, shaped as \
         {{\"score\": number, \"student_priority\": boolean, \"reasoning\": string, \"categories\": [string]}}.\n\n\
         Title: {}\nDescription: {}\nContent: {}",
        article.title, article.description, snippet
    )
}

/// Shared prompt for the weekly prose request.
pub(crate) fn newsletter_prompt(articles: &[Article], window: &WeekWindow) -> String {
    let mut listing = String::new();
    for article in articles {
        listing.push_str(&format!(
            "- {} (score {:.1}): {} [{}]\n",
            article.title, article.relevance_score, article.description, article.link
        ));
    }
    format!(
        "Write a friendly weekly newsletter in Markdown for university students, \
         covering {} ({}). Summarize each story in one short paragraph and keep \
         the article links. Stories:\n{}",
        window.date_range_label(),
        format!("week {} of {}", window.week, window.year),
        listing
    )
}

/// JSON payload the models are asked to reply with.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct AssessmentPayload {
    pub score: f64,
    #[serde(default)]
    pub student_priority: bool,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl AssessmentPayload {
    pub(crate) fn parse(text: &str) -> Result<cb_core::RelevanceAssessment> {
        // Models occasionally wrap the JSON in a code fence.
        let cleaned = text
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();
        let payload: AssessmentPayload = serde_json::from_str(cleaned)
            .map_err(|e| Error::Scoring(format!("unparseable assessment: {}", e)))?;
        Ok(cb_core::RelevanceAssessment {
            score: payload.score,
            student_priority: payload.student_priority,
            reasoning: payload.reasoning,
            categories: payload.categories,
        }
        .clamped())
    }
}
