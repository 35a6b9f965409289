use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::provider::{CompletionModel, LlmError};
use crate::core::config::LlmSettings;

/// Client for any server exposing `POST /v1/completions`
/// (llama.cpp server, LM Studio, vLLM, text-generation-inference).
#[derive(Clone)]
pub struct OpenAiCompatModel {
    base_url: String,
    model: String,
    api_key: Option<String>,
    seed: u64,
    client: Client,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: Option<String>,
}

impl OpenAiCompatModel {
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(LlmError::request)?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            seed: settings.seed,
            client,
        })
    }
}

#[async_trait]
impl CompletionModel for OpenAiCompatModel {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, max_output_tokens: usize) -> Result<String, LlmError> {
        let url = format!("{}/v1/completions", self.base_url);

        // Greedy decoding with a fixed seed: one output per prompt.
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "max_tokens": max_output_tokens,
            "temperature": 0.0,
            "seed": self.seed,
            "n": 1,
            "stream": false,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await.map_err(LlmError::request)?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let payload: CompletionResponse = res
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.text)
            .ok_or_else(|| LlmError::Malformed("response has no choices[0].text".to_string()))
    }
}
