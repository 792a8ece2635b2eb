use crate::config::Config;
use crate::retry::retry_provider_call;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Failure reported by the provider itself (as opposed to transport errors)
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("OpenAI API error ({status}): {body}")]
    Status { status: StatusCode, body: String },

    #[error("OpenAI response contained no choices")]
    NoChoices,
}

/// Send one system + user prompt pair and return the first choice's content.
///
/// Non-success statuses and empty `choices` are errors. Transient failures
/// are retried according to `config.retry` (see [`crate::retry::is_transient`]).
pub async fn chat_completion(
    client: &reqwest::Client,
    config: &Config,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<String> {
    let request = ChatRequest {
        model: config.openai_model.clone(),
        messages: vec![
            Message {
                role: "system".to_string(),
                content: system_prompt.to_string(),
            },
            Message {
                role: "user".to_string(),
                content: user_prompt.to_string(),
            },
        ],
        temperature: if is_reasoning_model(&config.openai_model) {
            None
        } else {
            Some(config.openai_temperature)
        },
    };
    let url = config.chat_completions_url();

    retry_provider_call(&config.retry, "Translation request", || async {
        let response = client
            .post(&url)
            .header("Authorization", format!("Bearer {}", config.openai_api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(anyhow::Error::new(ProviderError::Status { status, body }));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::Error::new(ProviderError::NoChoices))
    })
    .await
}
