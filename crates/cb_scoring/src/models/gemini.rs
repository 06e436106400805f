use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use cb_core::{Article, Error, RelevanceAssessment, Result, ScoringModel, WeekWindow};

use super::{assessment_prompt, newsletter_prompt, AssessmentPayload};

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiModel {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiModel {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let api_key = api_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Scoring("Gemini model requires an API key".to_string()))?;
        Ok(Self {
            client: Arc::new(Client::new()),
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
        })
    }

    async fn generate(&self, prompt: String, mime_type: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: mime_type.to_string(),
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent?key={}",
                self.base_url, self.model, self.api_key
            ))
            .json(&request)
            .send()
            .await?
            .json::<GenerateResponse>()
            .await?;

        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Scoring("Gemini returned no candidates".to_string()))
    }
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl ScoringModel for GeminiModel {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn assess_article(&self, article: &Article) -> Result<RelevanceAssessment> {
        let text = self
            .generate(assessment_prompt(article), "application/json")
            .await?;
        AssessmentPayload::parse(&text)
    }

    async fn compose_newsletter(
        &self,
        articles: &[Article],
        window: &WeekWindow,
    ) -> Result<String> {
        self.generate(newsletter_prompt(articles, window), "text/plain")
            .await
    }
}
