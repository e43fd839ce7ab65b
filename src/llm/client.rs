//! HTTP client for a hosted generative model
//!
//! Speaks the `generateContent` REST shape: one user turn in, candidate text
//! parts out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{parse_recommendation, RecommendError, RecommendationClient};
use crate::types::{PlantSnapshot, Recommendation};

/// Build the optimization prompt for one snapshot.
pub fn build_prompt(snapshot: &PlantSnapshot) -> String {
    let state = serde_json::to_string(snapshot).unwrap_or_else(|_| "{}".to_string());
    format!(
        "You are an AI assistant optimizing cement plant energy use.\n\
         Given this current plant state: {state}\n\n\
         Suggest 2-3 actionable process adjustments to improve energy efficiency, \
         without reducing product quality.\n\n\
         Return strictly valid JSON (no Markdown, no code blocks):\n\
         {{\n\
           \"recommendations\": [\n\
             {{\"parameter\": \"string\", \"action\": \"increase | decrease | maintain\", \"new_value\": float}}\n\
           ],\n\
           \"estimated_energy_saving_pct\": float,\n\
           \"confidence\": \"High | Medium | Low\",\n\
           \"explanation\": \"string\"\n\
         }}"
    )
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Recommender backed by a hosted model over HTTPS.
#[derive(Clone)]
pub struct HttpRecommender {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl HttpRecommender {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, RecommendError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String, RecommendError> {
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(RecommendError::ServerError(resp.status()));
        }

        let parsed: GenerateResponse = resp.json().await?;
        parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| RecommendError::Malformed("response has no text candidate".to_string()))
    }
}

#[async_trait]
impl RecommendationClient for HttpRecommender {
    async fn recommend(&self, snapshot: &PlantSnapshot) -> Result<Recommendation, RecommendError> {
        let prompt = build_prompt(snapshot);
        let raw = self.generate(&prompt).await?;
        tracing::debug!(model = %self.model, chars = raw.len(), "Recommender responded");
        parse_recommendation(&raw)
    }

    fn client_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_state_with_wire_names() {
        let snap = PlantSnapshot {
            kiln_temp: Some(1490.0),
            emissions_co2: Some(104.0),
            ..Default::default()
        };
        let prompt = build_prompt(&snap);
        assert!(prompt.contains("\"kiln_temp\":1490.0"));
        assert!(prompt.contains("emissions_CO2"));
        assert!(prompt.contains("estimated_energy_saving_pct"));
    }

    #[test]
    fn test_response_text_extraction_shape() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"{}"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        let text = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text);
        assert_eq!(text.as_deref(), Some("{}"));
    }
}
