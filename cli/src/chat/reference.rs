//! # chatrs Reference Lookup
//!
//! File: cli/src/chat/reference.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Backs the image/photo rule: given a subject, fetch a short summary from an
//! external reference source. The default source is Wikipedia's REST summary
//! endpoint; anything implementing `ReferenceLookup` can stand in.
//!
//! ## Outcomes
//!
//! - `Summary`: a normal article; its first paragraph is the reply.
//! - `Ambiguous`: a disambiguation page; the user is asked to be more specific.
//! - `NotFound`: no page with that title.
//!
//! Transport and server failures come back as `Err` and the session turns
//! them into the apology reply.
//!
use crate::common::network;
use crate::core::error::Result;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// Result of looking a subject up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceOutcome {
    Summary { title: String, extract: String },
    Ambiguous,
    NotFound,
}

#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    async fn lookup(&self, subject: &str) -> Result<ReferenceOutcome>;
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: String,
}

/// Wikipedia REST (`/page/summary/{title}`) lookup.
#[derive(Debug, Clone)]
pub struct WikipediaLookup {
    client: Client,
    base_url: String,
}

impl WikipediaLookup {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn summary_url(&self, subject: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&format!("{}/page/summary/", self.base_url))
            .with_context(|| format!("Invalid reference base URL '{}'", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Reference base URL cannot carry a path"))?
            .pop_if_empty()
            .push(&title_case_underscored(subject));
        Ok(url)
    }
}

/// `eiffel tower` -> `Eiffel_Tower`, the form Wikipedia titles take.
fn title_case_underscored(subject: &str) -> String {
    subject
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("_")
}

#[async_trait]
impl ReferenceLookup for WikipediaLookup {
    async fn lookup(&self, subject: &str) -> Result<ReferenceOutcome> {
        let url = self.summary_url(subject)?;
        debug!("Reference lookup: GET {}", url);
        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => return Ok(ReferenceOutcome::NotFound),
            status if !status.is_success() => {
                let body = network::error_body(response).await;
                return Err(anyhow!("Reference service returned {}: {}", status, body));
            }
            _ => {}
        }
        let summary: SummaryResponse = response
            .json()
            .await
            .context("Malformed reference summary")?;
        Ok(match summary.kind.as_str() {
            "disambiguation" => ReferenceOutcome::Ambiguous,
            _ if summary.extract.trim().is_empty() => ReferenceOutcome::NotFound,
            _ => ReferenceOutcome::Summary {
                title: summary.title,
                extract: summary.extract.trim().to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_title_case_underscored() {
        assert_eq!(title_case_underscored("eiffel tower"), "Eiffel_Tower");
        assert_eq!(title_case_underscored("  taj   mahal "), "Taj_Mahal");
    }

    #[tokio::test]
    async fn test_summary_outcomes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page/summary/Eiffel_Tower"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "standard",
                "title": "Eiffel Tower",
                "extract": "The Eiffel Tower is a wrought-iron lattice tower in Paris. "
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page/summary/Mercury"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "disambiguation",
                "title": "Mercury",
                "extract": "Mercury may refer to:"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page/summary/Qwzx"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let lookup = WikipediaLookup::new(Client::new(), &format!("{}/", server.uri()));

        assert_eq!(
            lookup.lookup("eiffel tower").await.unwrap(),
            ReferenceOutcome::Summary {
                title: "Eiffel Tower".into(),
                extract: "The Eiffel Tower is a wrought-iron lattice tower in Paris.".into()
            }
        );
        assert_eq!(
            lookup.lookup("mercury").await.unwrap(),
            ReferenceOutcome::Ambiguous
        );
        assert_eq!(
            lookup.lookup("qwzx").await.unwrap(),
            ReferenceOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_server_error_is_err() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let lookup = WikipediaLookup::new(Client::new(), &server.uri());
        let err = lookup.lookup("anything").await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
