//! # chatrs Locale Resolution (`common::locale`)
//!
//! File: cli/src/common/locale.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! The clock and venue rules need to know the caller's UTC offset and city.
//! Both come from a `LocaleSource`: either fixed values from the `[locale]`
//! table, or an IP-geolocation lookup cached for an hour (by default) with the
//! fixed values as a fallback when the lookup fails.
//!
//! ## Examples
//!
//! ```rust
//! let source = locale::source_from_config(&config.locale, clock.clone())?;
//! let here = source.locale().await;
//! let local = now.with_timezone(&here.offset);
//! ```
//!
use crate::common::clock::Clock;
use crate::common::network;
use crate::core::config::LocaleConfig;
use crate::core::error::{ChatrsError, Result};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Resolved ambient location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    pub offset: FixedOffset,
    pub zone_label: String,
    pub city: Option<String>,
}

impl Locale {
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
            zone_label: "UTC".to_string(),
            city: None,
        }
    }
}

/// Parses offsets such as `+05:30`, `-0800`, `+02`, `Z` or `UTC`.
pub fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if matches!(raw.to_ascii_uppercase().as_str(), "Z" | "UTC" | "GMT") {
        return FixedOffset::east_opt(0);
    }
    let (sign, rest) = match raw.chars().next()? {
        '+' => (1, &raw[1..]),
        '-' => (-1, &raw[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 14 || minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Anything that can say where the conversation is happening.
#[async_trait]
pub trait LocaleSource: Send + Sync {
    async fn locale(&self) -> Locale;
}

/// Fixed locale from configuration.
#[derive(Debug, Clone)]
pub struct StaticLocale(Locale);

impl StaticLocale {
    #[cfg(test)]
    pub fn new(locale: Locale) -> Self {
        Self(locale)
    }

    pub fn from_config(config: &LocaleConfig) -> Result<Self> {
        let offset = parse_utc_offset(&config.utc_offset).ok_or_else(|| {
            anyhow!(ChatrsError::Config(format!(
                "Invalid locale.utc_offset '{}'",
                config.utc_offset
            )))
        })?;
        Ok(Self(Locale {
            offset,
            zone_label: config.zone_label.clone(),
            city: config.city.clone(),
        }))
    }
}

#[async_trait]
impl LocaleSource for StaticLocale {
    async fn locale(&self) -> Locale {
        self.0.clone()
    }
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    utc_offset: Option<String>,
}

/// IP-geolocation backed locale with a time-based cache.
pub struct GeoLocale {
    client: Client,
    url: String,
    ttl: Duration,
    fallback: Locale,
    clock: Arc<dyn Clock>,
    cache: Mutex<Option<(DateTime<Utc>, Locale)>>,
}

impl GeoLocale {
    pub fn new(
        client: Client,
        url: impl Into<String>,
        ttl: Duration,
        fallback: Locale,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            ttl,
            fallback,
            clock,
            cache: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<Locale> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = network::error_body(response).await;
            return Err(anyhow!(ChatrsError::Geolocation(format!(
                "{} returned {}: {}",
                self.url, status, body
            ))));
        }
        let geo: GeoResponse = response.json().await?;
        let offset = geo
            .utc_offset
            .as_deref()
            .and_then(parse_utc_offset)
            .ok_or_else(|| {
                anyhow!(ChatrsError::Geolocation(format!(
                    "missing or invalid utc_offset {:?}",
                    geo.utc_offset
                )))
            })?;
        Ok(Locale {
            offset,
            zone_label: geo
                .timezone
                .filter(|tz| !tz.trim().is_empty())
                .unwrap_or_else(|| offset.to_string()),
            city: geo.city.or_else(|| self.fallback.city.clone()),
        })
    }
}

#[async_trait]
impl LocaleSource for GeoLocale {
    async fn locale(&self) -> Locale {
        let now = self.clock.now();
        // The cache lock is never held across the lookup.
        let cached = self.cache.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some((fetched_at, locale)) = cached {
            if now - fetched_at < self.ttl {
                debug!("Using cached geolocation from {}", fetched_at);
                return locale;
            }
        }
        match self.fetch().await {
            Ok(locale) => {
                info!(
                    "Geolocated to {:?} ({})",
                    locale.city, locale.zone_label
                );
                *self.cache.lock().unwrap_or_else(|e| e.into_inner()) =
                    Some((now, locale.clone()));
                locale
            }
            Err(e) => {
                warn!("Geolocation failed, using configured locale: {:#}", e);
                self.fallback.clone()
            }
        }
    }
}

/// Picks the locale source described by `[locale]`.
pub fn source_from_config(
    config: &LocaleConfig,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn LocaleSource>> {
    let fixed = StaticLocale::from_config(config)?;
    if !config.geolocate {
        return Ok(Arc::new(fixed));
    }
    let client = network::build_client(std::time::Duration::from_secs(5))?;
    Ok(Arc::new(GeoLocale::new(
        client,
        config.geo_url.clone(),
        Duration::seconds(config.geo_cache_secs as i64),
        fixed.0,
        clock,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::clock::FixedClock;
    use chrono::TimeZone;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_utc_offset_forms() {
        assert_eq!(parse_utc_offset("+05:30").unwrap().local_minus_utc(), 19800);
        assert_eq!(parse_utc_offset("+0530").unwrap().local_minus_utc(), 19800);
        assert_eq!(parse_utc_offset("-08").unwrap().local_minus_utc(), -28800);
        assert_eq!(parse_utc_offset("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(parse_utc_offset("z").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("05:30").is_none());
        assert!(parse_utc_offset("+25:00").is_none());
        assert!(parse_utc_offset("+5:3").is_none());
        assert!(parse_utc_offset("").is_none());
    }

    #[tokio::test]
    async fn test_static_locale_from_config() {
        let config = LocaleConfig {
            utc_offset: "+05:30".into(),
            zone_label: "IST".into(),
            city: Some("bengaluru".into()),
            ..Default::default()
        };
        let locale = StaticLocale::from_config(&config).unwrap().locale().await;
        assert_eq!(locale.zone_label, "IST");
        assert_eq!(locale.city.as_deref(), Some("bengaluru"));
        assert_eq!(locale.offset.local_minus_utc(), 19800);
    }

    fn geo(server: &MockServer, clock: Arc<FixedClock>) -> GeoLocale {
        GeoLocale::new(
            Client::new(),
            format!("{}/json/", server.uri()),
            Duration::hours(1),
            Locale::utc(),
            clock,
        )
    }

    #[tokio::test]
    async fn test_geolocation_is_cached_for_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "city": "Bengaluru",
                "timezone": "Asia/Kolkata",
                "utc_offset": "+0530"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap(),
        ));
        let source = geo(&server, clock.clone());

        let first = source.locale().await;
        assert_eq!(first.city.as_deref(), Some("Bengaluru"));
        assert_eq!(first.zone_label, "Asia/Kolkata");
        assert_eq!(first.offset.local_minus_utc(), 19800);

        clock.advance(Duration::minutes(59));
        assert_eq!(source.locale().await, first); // Cached

        clock.advance(Duration::minutes(2));
        assert_eq!(source.locale().await, first); // Refetched (second hit)
    }

    #[tokio::test]
    async fn test_geolocation_failure_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let clock = Arc::new(FixedClock::new(Utc::now()));
        let source = geo(&server, clock);
        assert_eq!(source.locale().await, Locale::utc());
    }

    #[tokio::test]
    async fn test_slow_lookups_do_not_queue_behind_each_other() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(503).set_delay(std::time::Duration::from_millis(400)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let source = geo(&server, Arc::new(FixedClock::new(Utc::now())));
        let started = std::time::Instant::now();
        let (a, b) = tokio::join!(source.locale(), source.locale());
        assert_eq!(a, Locale::utc());
        assert_eq!(b, Locale::utc());
        assert!(
            started.elapsed() < std::time::Duration::from_millis(750),
            "lookups ran one after another: {:?}",
            started.elapsed()
        );
    }
}
