use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use cb_core::{Article, Error, RelevanceAssessment, Result, ScoringModel, WeekWindow};

use super::{assessment_prompt, newsletter_prompt, AssessmentPayload};

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

pub struct MistralModel {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
    model: String,
}

impl MistralModel {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let api_key = api_key
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Scoring("Mistral model requires an API key".to_string()))?;
        Ok(Self {
            client: Arc::new(Client::new()),
            api_key,
            base_url: "https://api.mistral.ai/v1".to_string(),
            model: "mistral-small-latest".to_string(),
        })
    }

    async fn chat(&self, prompt: String) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?
            .json::<ChatResponse>()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Scoring("Mistral returned no choices".to_string()))
    }
}

impl fmt::Debug for MistralModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MistralModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl ScoringModel for MistralModel {
    fn name(&self) -> &str {
        "Mistral"
    }

    async fn assess_article(&self, article: &Article) -> Result<RelevanceAssessment> {
        let text = self.chat(assessment_prompt(article)).await?;
        AssessmentPayload::parse(&text)
    }

    async fn compose_newsletter(
        &self,
        articles: &[Article],
        window: &WeekWindow,
    ) -> Result<String> {
        self.chat(newsletter_prompt(articles, window)).await
    }
}
