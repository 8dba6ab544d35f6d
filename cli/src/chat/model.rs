//! # chatrs Model Client
//!
//! File: cli/src/chat/model.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! The hosted chat-completion service, seen through the `ChatModel` trait.
//! `OpenAiCompatible` speaks the `POST {base}/chat/completions` dialect used by
//! OpenAI and most self-hosted gateways, with or without server-sent events.
//!
//! ## Errors
//!
//! - Missing key: `ChatrsError::MissingApiKey`
//! - HTTP 429: `ChatrsError::RateLimited` (with `Retry-After` seconds if sent)
//! - Other non-2xx: `ChatrsError::ModelApi`
//! - No text in the reply: `ChatrsError::EmptyCompletion`
//!
//! None of these reach the user directly; `chat::fallback` decides what to say.
//!
use crate::chat::transcript::Turn;
use crate::common::network;
use crate::core::config::ModelConfig;
use crate::core::error::{ChatrsError, Result};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

/// Receives text deltas as a streamed completion arrives.
pub type DeltaSink<'a> = &'a mut (dyn FnMut(&str) + Send);

/// Everything one completion call needs.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub temperature: f64,
    pub turns: &'a [Turn],
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the whole completion text.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String>;

    /// Streams deltas into `sink` and returns the concatenated text.
    /// The default emits the whole completion as a single delta.
    async fn complete_streaming(
        &self,
        request: CompletionRequest<'_>,
        sink: DeltaSink<'_>,
    ) -> Result<String> {
        let text = self.complete(request).await?;
        sink(&text);
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f64,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireContent,
}

#[derive(Debug, Deserialize)]
struct WireChunk {
    #[serde(default)]
    choices: Vec<WireChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChunkChoice {
    #[serde(default)]
    delta: Option<WireContent>,
}

#[derive(Debug, Deserialize, Default)]
struct WireContent {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completion client.
#[derive(Debug, Clone)]
pub struct OpenAiCompatible {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl OpenAiCompatible {
    pub fn new(client: Client, base_url: &str, api_key: Option<String>, api_key_env: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            api_key_env: api_key_env.to_string(),
        }
    }

    /// Builds the client from `[model]`, reading the key from the environment.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let client = network::build_client(Duration::from_secs(config.timeout_secs))?;
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            debug!(
                "{} is not set; model calls will fail until it is",
                config.api_key_env
            );
        }
        Ok(Self::new(
            client,
            &config.base_url,
            api_key,
            &config.api_key_env,
        ))
    }

    async fn send(&self, request: CompletionRequest<'_>, stream: bool) -> Result<reqwest::Response> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            anyhow!(ChatrsError::MissingApiKey {
                env: self.api_key_env.clone(),
            })
        })?;
        let body = WireRequest {
            model: request.model,
            messages: request
                .turns
                .iter()
                .map(|turn| WireMessage {
                    role: turn.role().as_str(),
                    content: turn.text(),
                })
                .collect(),
            temperature: request.temperature,
            stream,
        };
        debug!(
            "POST {}/chat/completions ({} turns, model {}, stream {})",
            self.base_url,
            body.messages.len(),
            body.model,
            stream
        );
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .context("Chat completion request failed")?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = network::retry_after_secs(response.headers());
            return Err(anyhow!(ChatrsError::RateLimited { retry_after_secs }));
        }
        if !status.is_success() {
            let body = network::error_body(response).await;
            return Err(anyhow!(ChatrsError::ModelApi {
                status: status.as_u16(),
                body,
            }));
        }
        Ok(response)
    }
}

/// Pulls the text delta out of one SSE line.
///
/// `Ok(None)` for lines that carry nothing (comments, blank lines, empty
/// deltas); `Err` only for a `data:` payload that is not valid JSON.
fn parse_sse_line(line: &str) -> Result<Option<SseEvent>> {
    let line = line.trim_end_matches('\r');
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(Some(SseEvent::Done));
    }
    if payload.is_empty() {
        return Ok(None);
    }
    let chunk: WireChunk =
        serde_json::from_str(payload).with_context(|| format!("Malformed stream chunk: {payload}"))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|text| !text.is_empty())
        .map(SseEvent::Delta))
}

#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    Delta(String),
    Done,
}

#[async_trait]
impl ChatModel for OpenAiCompatible {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
        let response = self.send(request, false).await?;
        let parsed: WireResponse = response
            .json()
            .await
            .context("Malformed chat completion response")?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow!(ChatrsError::EmptyCompletion))
    }

    async fn complete_streaming(
        &self,
        request: CompletionRequest<'_>,
        sink: DeltaSink<'_>,
    ) -> Result<String> {
        let response = self.send(request, true).await?;
        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut text = String::new();

        'outer: while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Chat completion stream interrupted")?;
            buffer.extend_from_slice(&chunk);
            while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                let line = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
                match parse_sse_line(&line)? {
                    Some(SseEvent::Delta(delta)) => {
                        trace!("delta: {:?}", delta);
                        sink(&delta);
                        text.push_str(&delta);
                    }
                    Some(SseEvent::Done) => break 'outer,
                    None => {}
                }
            }
        }

        if text.trim().is_empty() {
            return Err(anyhow!(ChatrsError::EmptyCompletion));
        }
        Ok(text)
    }
}
