//! # chatrs Feedback Webhook
//!
//! File: cli/src/chat/feedback.rs
//! Author: Christi Mahu
//!
//! Posts free-text feedback as `{"message": "..."}` to the configured webhook.
//! Delivery is fire-and-forget: callers only learn success or failure.

use crate::common::network;
use crate::core::config::FeedbackConfig;
use crate::core::error::{ChatrsError, Result};
use anyhow::anyhow;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct FeedbackPayload<'a> {
    message: &'a str,
}

#[derive(Debug, Clone)]
pub struct FeedbackClient {
    client: Client,
    url: String,
}

impl FeedbackClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Builds a client from `[feedback]`. A missing `url` is a configuration error.
    pub fn from_config(config: &FeedbackConfig) -> Result<Self> {
        let url = config.url.as_deref().ok_or_else(|| {
            anyhow!(ChatrsError::Config(
                "feedback.url is not set; add it to [feedback] to send feedback.".to_string()
            ))
        })?;
        let client = network::build_client(Duration::from_secs(10))?;
        Ok(Self::new(client, url))
    }

    pub async fn submit(&self, text: &str) -> Result<()> {
        let message = text.trim();
        if message.is_empty() {
            return Err(anyhow!(ChatrsError::Feedback(
                "feedback text is empty".to_string()
            )));
        }
        debug!("POST feedback ({} chars) to {}", message.len(), self.url);
        let response = self
            .client
            .post(&self.url)
            .json(&FeedbackPayload { message })
            .send()
            .await
            .map_err(|e| anyhow!(ChatrsError::Feedback(e.to_string())))?;
        let status = response.status();
        if !status.is_success() {
            let body = network::error_body(response).await;
            return Err(anyhow!(ChatrsError::Feedback(format!(
                "webhook returned {}: {}",
                status, body
            ))));
        }
        info!("Feedback delivered");
        Ok(())
    }
}
