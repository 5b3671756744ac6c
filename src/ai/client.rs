use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;

use super::errors::PromptError;
use super::prompts::{
    analysis_output_schema, playlist_output_schema, render, AnalyzeListeningHistoryInput,
    GeneratePlaylistInput, GeneratePlaylistOutput, PromptTemplate, ANALYZE_LISTENING_HISTORY,
    GENERATE_PLAYLIST,
};
use crate::models::AnalysisResult;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The hosted prompt flows the player calls.
#[async_trait]
pub trait PromptService: Send + Sync {
    async fn analyze_listening_history(
        &self,
        listening_history: &str,
    ) -> Result<AnalysisResult, PromptError>;

    /// Returns song names formatted `"Title by Artist"`, in the model's order.
    async fn generate_playlist(
        &self,
        listening_history: &str,
        current_requests: &str,
    ) -> Result<Vec<String>, PromptError>;
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    song_count: usize,
}

impl GeminiClient {
    pub fn new(client: Client, api_key: String, model: String, song_count: usize) -> Self {
        Self {
            client,
            api_key,
            model,
            song_count,
        }
    }

    async fn run<T: DeserializeOwned>(
        &self,
        prompt: &PromptTemplate,
        vars: HashMap<&'static str, String>,
        schema: Value,
    ) -> Result<T, PromptError> {
        let text = render(prompt.template, &vars)?;
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        });

        let url = format!("{}/models/{}:generateContent", GEMINI_API_BASE, self.model);
        log::debug!("Calling {} on {}", prompt.name, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload: Value = response.json().await?;

        if !status.is_success() {
            let message = payload["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            log::warn!("{} failed ({}): {}", prompt.name, status, message);
            return Err(PromptError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let output = extract_text(&payload).ok_or_else(|| {
            PromptError::EmptyResponse(
                payload["promptFeedback"]["blockReason"]
                    .as_str()
                    .map(|s| s.to_string()),
            )
        })?;

        decode_output(&output)
    }
}

#[async_trait]
impl PromptService for GeminiClient {
    async fn analyze_listening_history(
        &self,
        listening_history: &str,
    ) -> Result<AnalysisResult, PromptError> {
        let input = AnalyzeListeningHistoryInput { listening_history };
        self.run(&ANALYZE_LISTENING_HISTORY, input.vars(), analysis_output_schema())
            .await
    }

    async fn generate_playlist(
        &self,
        listening_history: &str,
        current_requests: &str,
    ) -> Result<Vec<String>, PromptError> {
        let input = GeneratePlaylistInput {
            listening_history,
            current_requests,
            song_count: self.song_count,
        };
        let output: GeneratePlaylistOutput = self
            .run(&GENERATE_PLAYLIST, input.vars(), playlist_output_schema())
            .await?;

        let names: Vec<String> = output
            .playlist
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        log::info!("Model suggested {} songs for '{}'", names.len(), current_requests);
        Ok(names)
    }
}

/// Concatenated text parts of the first candidate.
fn extract_text(payload: &Value) -> Option<String> {
    let parts = payload["candidates"].get(0)?["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Decode JSON model output, tolerating a Markdown code fence around it.
fn decode_output<T: DeserializeOwned>(text: &str) -> Result<T, PromptError> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(unfenced.trim()).map_err(|e| PromptError::InvalidOutput(e.to_string()))
}
