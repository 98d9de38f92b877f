//! Ollama embeddings client

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::{Config, ParleyError, Result};

/// Client for the Ollama embeddings API
#[derive(Clone)]
pub struct OllamaEmbeddings {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddings {
    /// Create a client from configuration, using the configured embed model
    pub fn from_config(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.ollama.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.ollama_url(),
            model: config.chat.embed_model.clone(),
        }
    }

    /// Create a client with custom base URL and model
    pub fn with_base_url(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    /// Model in use
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed a batch of texts into dense vectors
    pub async fn embed(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ParleyError::ollama(format!(
                        "Cannot connect to Ollama at {}. Is it running?",
                        self.base_url
                    ))
                } else {
                    ParleyError::from(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 404 && error_text.contains("not found") {
                return Err(ParleyError::ModelNotFound(self.model.clone()));
            }

            return Err(ParleyError::ollama(format!(
                "Ollama embed error ({}): {}",
                status, error_text
            )));
        }

        let embed_response: EmbedResponse = response.json().await?;

        if embed_response.embeddings.len() != inputs.len() {
            return Err(ParleyError::ollama(format!(
                "Expected {} embeddings, got {}",
                inputs.len(),
                embed_response.embeddings.len()
            )));
        }

        Ok(embed_response.embeddings)
    }

    /// Embed a single query string
    pub async fn embed_query(&self, input: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[input]).await?;
        vectors
            .pop()
            .ok_or_else(|| ParleyError::ollama("Embed response was empty"))
    }
}
