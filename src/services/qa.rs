// src/services/qa.rs
use crate::errors::GatewayError;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

/// Seam to the external answer-generation collaborator. The retrieval
/// pipeline itself lives outside this gateway; we only hand over the question
/// and whatever patient context the frontend attached.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(
        &self,
        question: &str,
        user_details: Option<&Value>,
    ) -> Result<String, GatewayError>;
}

const QA_INSTRUCTION: &str = "You are a medical question-answering assistant. \
    Answer the patient's question using the supplied patient details when they \
    are relevant. Be factual and concise, and recommend consulting a doctor \
    for anything requiring diagnosis.";

/// Production generator backed by the same hosted generative-language API the
/// chat gateway uses, but one-shot: no session, no retained history.
pub struct GeminiAnswerGenerator {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl GeminiAnswerGenerator {
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl AnswerGenerator for GeminiAnswerGenerator {
    async fn generate(
        &self,
        question: &str,
        user_details: Option<&Value>,
    ) -> Result<String, GatewayError> {
        let prompt = match user_details {
            Some(details) => format!("Patient details: {details}\n\nQuestion: {question}"),
            None => format!("Question: {question}"),
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.api_url, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "systemInstruction": { "parts": [{ "text": QA_INSTRUCTION }] },
                "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await
            .map_err(|e| GatewayError::Provider(format!("answer request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Provider(format!(
                "answer provider returned {status}: {error_text}"
            )));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Provider(format!("invalid answer response: {e}")))?;

        result["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| GatewayError::Provider("no text in answer response".to_string()))
    }
}
