//! Poem client: the single point of entry for text-generation calls.
//!
//! Sends a fixed prompt to the Hugging Face inference API and cleans the reply
//! (echoed prompt removed, blank lines dropped).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::upstream::{read_body, send_with_retry, ServiceError};

pub mod prompts;

use prompts::build_poem_prompt;

const SERVICE: &str = "Hugging Face";
/// Model the default endpoint points at; logged at startup.
pub const MODEL: &str = "mistralai/Mixtral-8x7B-Instruct-v0.1";

#[derive(Debug, Error)]
pub enum PoemError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Text generation returned no candidates")]
    EmptyContent,
}

#[async_trait]
pub trait PoemGenerator: Send + Sync {
    async fn generate_poem(&self, name: &str) -> Result<String, PoemError>;
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
struct InferenceError {
    error: String,
}

#[derive(Clone)]
pub struct HuggingFaceClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl HuggingFaceClient {
    pub fn new(client: Client, endpoint: impl Into<String>, token: String) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token,
        }
    }
}

#[async_trait]
impl PoemGenerator for HuggingFaceClient {
    async fn generate_poem(&self, name: &str) -> Result<String, PoemError> {
        let prompt = build_poem_prompt(name);
        let request_body = InferenceRequest { inputs: &prompt };

        let response = send_with_retry(SERVICE, || {
            self.client
                .post(&self.endpoint)
                .bearer_auth(&self.token)
                .json(&request_body)
        })
        .await?;

        let status = response.status();
        let body = read_body(SERVICE, response).await?;

        if !status.is_success() {
            let message = serde_json::from_str::<InferenceError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(PoemError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let candidates: Vec<Candidate> = serde_json::from_str(&body)?;
        let first = candidates.into_iter().next().ok_or(PoemError::EmptyContent)?;

        debug!("Poem generated for '{name}'");
        Ok(clean_poem(&first.generated_text, &prompt))
    }
}

/// Removes the echoed prompt and drops blank lines.
pub fn clean_poem(generated: &str, prompt: &str) -> String {
    generated
        .replace(prompt, "")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
