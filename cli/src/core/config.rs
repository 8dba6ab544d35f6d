//! # chatrs Configuration System
//!
//! File: cli/src/core/config.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module implements the configuration system for chatrs, handling loading,
//! merging, validation, and access to configuration data. It supports a multi-level
//! configuration approach that combines defaults, user settings, and project-specific
//! overrides.
//!
//! ## Architecture
//!
//! Configuration sources (in order of precedence):
//! 1. Command-line flags (`--model`, `--temperature`, `--stream`), applied by the commands
//! 2. Project-specific `.chatrs.toml` in current directory or ancestors
//! 3. User-specific `config.toml` in the platform config directory
//! 4. Default values defined in the code
//!
//! Project and user files are merged table-by-table before deserialization, so
//! a project file only needs the keys it wants to change. Passing `--config`
//! (or setting `CHATRS_CONFIG`) skips discovery and loads exactly one file.
//!
//! ## Examples
//!
//! ```toml
//! [model]
//! model = "gpt-4o-mini"
//! temperature = 0.4
//! stream = true
//!
//! [locale]
//! utc_offset = "+05:30"
//! zone_label = "IST"
//! city = "bengaluru"
//!
//! [[venues]]
//! city = "pune"
//! category = "cafe"
//! items = ["Vohuman Cafe", "German Bakery"]
//! ```
//!
use crate::chat::fallback::MAX_COOLDOWN_SECS;
use crate::chat::venues::VenueCategory;
use crate::common::locale::parse_utc_offset;
use crate::core::error::{ChatrsError, Result};
use crate::core::templating::ReplyTemplates;
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub assistant: AssistantConfig,
    pub model: ModelConfig,
    pub router: RouterConfig,
    pub locale: LocaleConfig,
    pub reference: ReferenceConfig,
    pub feedback: FeedbackConfig,
    pub transcript: TranscriptConfig,
    pub replies: RepliesConfig,
    /// Extra or replacement venue lists for the venue rule.
    pub venues: Vec<VenueEntry>,
}

/// Settings describing the assistant persona sent to the model.
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct AssistantConfig {
    /// Leading system turn inserted before the first model call.
    pub system_prompt: String,
}

/// Settings for the hosted chat-completion service.
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Sampling temperature, 0.0 to 1.0.
    pub temperature: f64,
    /// Name of the environment variable holding the bearer key.
    pub api_key_env: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// Ask for server-sent events and forward deltas as they arrive.
    pub stream: bool,
    /// Re-attempt a failed call once after `retry_delay_ms`.
    pub retry_once: bool,
    pub retry_delay_ms: u64,
    /// Lockout after a rate limit when the service gives no Retry-After.
    pub cooldown_secs: u64,
}

/// How the intent rules match user text.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Raw substring tests on the lowercased utterance.
    Substring,
    /// Whole-token keywords and exact phrase sets for the clock rules.
    #[default]
    Phrase,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    pub match_mode: MatchMode,
}

/// Where "now" is and which city "near me" refers to.
#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct LocaleConfig {
    /// Fixed UTC offset such as `+05:30`, used unless geolocation succeeds.
    pub utc_offset: String,
    /// Label printed next to times, e.g. `UTC` or `IST`.
    pub zone_label: String,
    /// Default city for venue suggestions.
    pub city: Option<String>,
    /// Resolve offset and city from the caller's IP address.
    pub geolocate: bool,
    pub geo_url: String,
    pub geo_cache_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct ReferenceConfig {
    /// Wikipedia REST base, e.g. `https://en.wikipedia.org/api/rest_v1`.
    pub base_url: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct FeedbackConfig {
    /// Form-relay endpoint receiving `{"message": ...}` posts.
    pub url: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct TranscriptConfig {
    /// Maximum non-system turns kept per session; `0` keeps everything.
    pub max_turns: usize,
}

/// Optional tera overrides for the canned replies.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct RepliesConfig {
    pub greeting: Option<String>,
    pub time: Option<String>,
    pub today: Option<String>,
    pub tomorrow: Option<String>,
    pub venues: Option<String>,
    pub reference_empty: Option<String>,
    pub reference_ambiguous: Option<String>,
    pub reference_missing: Option<String>,
    pub apology: Option<String>,
    pub cooldown: Option<String>,
}

/// One `[[venues]]` table.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct VenueEntry {
    pub city: String,
    pub category: VenueCategory,
    pub items: Vec<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
            stream: false,
            retry_once: false,
            retry_delay_ms: 2000,
            cooldown_secs: 30,
        }
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            utc_offset: "+00:00".to_string(),
            zone_label: "UTC".to_string(),
            city: None,
            geolocate: false,
            geo_url: "https://ipapi.co/json/".to_string(),
            geo_cache_secs: 3600,
        }
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://en.wikipedia.org/api/rest_v1".to_string(),
        }
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self { max_turns: 50 }
    }
}

fn default_system_prompt() -> String {
    "You are a friendly, concise assistant. Answer in a few sentences unless asked for more."
        .to_string()
}

impl Config {
    /// Applies per-invocation overrides from the command line and re-checks them.
    pub fn with_model_overrides(
        mut self,
        model: Option<String>,
        temperature: Option<f64>,
        stream: bool,
    ) -> Result<Self> {
        if let Some(model) = model {
            self.model.model = model;
        }
        if let Some(temperature) = temperature {
            self.model.temperature = temperature;
        }
        if stream {
            self.model.stream = true;
        }
        validate_config(&self).context("Invalid command-line override")?;
        Ok(self)
    }
}

const PROJECT_CONFIG_FILENAME: &str = ".chatrs.toml";

/// Loads the effective configuration.
///
/// With `explicit` set, only that file is read. Otherwise the user file and the
/// nearest project file are merged, project keys winning.
///
/// ## Arguments
///
/// * `explicit`: The `--config` / `CHATRS_CONFIG` path, if one was given.
///
/// ## Returns
///
/// * `Result<Config>`: The merged, validated configuration. Missing files are
///   not an error during discovery; a missing explicit file is.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    // Either the one explicit file, or user + project merged.
    let merged = match explicit {
        Some(path) => {
            let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
            info!("Loading configuration from: {}", expanded.display());
            load_table_from_path(&expanded)?
        }
        None => {
            // User config is the base; a missing file is just an empty table.
            let mut base = load_user_table()?.unwrap_or_default();
            if let Some(project) = load_project_table()? {
                merge_tables(&mut base, project);
            }
            base
        }
    };
    // Deserialize once, after merging, so section defaults fill any gaps.
    let config: Config = toml::Value::Table(merged)
        .try_into()
        .context("Failed to interpret merged configuration")?;
    validate_config(&config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", config);
    Ok(config)
}

fn load_user_table() -> Result<Option<toml::Table>> {
    if let Some(proj_dirs) = ProjectDirs::from("dev", "chatrs", "chatrs") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            load_table_from_path(&config_path).map(Some)
        } else {
            debug!(
                "User configuration file not found at {}",
                config_path.display()
            );
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_table() -> Result<Option<toml::Table>> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    if let Some(project_config_path) = find_project_config_path(&current_dir) {
        info!(
            "Loading project configuration from: {}",
            project_config_path.display()
        );
        load_table_from_path(&project_config_path).map(Some)
    } else {
        debug!("No project configuration file (.chatrs.toml) found in current directory or ancestors.");
        Ok(None)
    }
}

fn find_project_config_path(start: &Path) -> Option<PathBuf> {
    let mut path = start;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

fn load_table_from_path(path: &Path) -> Result<toml::Table> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    content
        .parse::<toml::Table>()
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

/// Overlays `overlay` onto `base`. Nested tables merge key by key; any other
/// value (arrays included) is replaced wholesale.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn validate_config(config: &Config) -> Result<()> {
    debug!("Validating configuration...");
    let model = &config.model;

    // Check model parameters
    if !(0.0..=1.0).contains(&model.temperature) {
        return Err(anyhow!(ChatrsError::Config(format!(
            "model.temperature must be between 0.0 and 1.0, got {}",
            model.temperature
        ))));
    }
    if model.model.trim().is_empty() {
        return Err(anyhow!(ChatrsError::Config(
            "model.model cannot be empty.".to_string()
        )));
    }
    if !(1..=MAX_COOLDOWN_SECS).contains(&model.cooldown_secs) {
        return Err(anyhow!(ChatrsError::Config(format!(
            "model.cooldown_secs must be between 1 and {}, got {}",
            MAX_COOLDOWN_SECS, model.cooldown_secs
        ))));
    }

    // Check outbound endpoints
    for (name, url) in [
        ("model.base_url", model.base_url.as_str()),
        ("reference.base_url", config.reference.base_url.as_str()),
        ("locale.geo_url", config.locale.geo_url.as_str()),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow!(ChatrsError::Config(format!(
                "{} must be an http(s) URL, got '{}'",
                name, url
            ))));
        }
    }
    // Check locale and venue tables
    if parse_utc_offset(&config.locale.utc_offset).is_none() {
        return Err(anyhow!(ChatrsError::Config(format!(
            "Invalid locale.utc_offset '{}'. Expected something like +05:30.",
            config.locale.utc_offset
        ))));
    }
    for entry in &config.venues {
        if entry.city.trim().is_empty() || entry.items.is_empty() {
            return Err(anyhow!(ChatrsError::Config(format!(
                "Venue list for '{}' needs a city and at least one item.",
                entry.city
            ))));
        }
    }
    // Compile reply overrides now rather than on the first matching turn
    ReplyTemplates::from_config(&config.replies).context("Invalid [replies] template")?;
    debug!("Configuration validation successful.");
    Ok(())
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_deserialize_basic_toml() {
        let toml_content = r#"
            [model]
            model = "llama-3.1-8b"
            temperature = 0.2
            stream = true

            [router]
            match_mode = "substring"

            [locale]
            utc_offset = "+05:30"
            zone_label = "IST"
            city = "bengaluru"

            [[venues]]
            city = "pune"
            category = "cafe"
            items = ["Vohuman Cafe"]
        "#;

        let config: Config = toml::from_str(toml_content).expect("Failed to parse TOML");

        assert_eq!(config.model.model, "llama-3.1-8b");
        assert_eq!(config.model.temperature, 0.2);
        assert!(config.model.stream);
        assert_eq!(config.model.api_key_env, "OPENAI_API_KEY"); // Default
        assert_eq!(config.router.match_mode, MatchMode::Substring);
        assert_eq!(config.locale.zone_label, "IST");
        assert_eq!(config.locale.city.as_deref(), Some("bengaluru"));
        assert_eq!(config.locale.geo_cache_secs, 3600); // Default
        assert_eq!(config.transcript.max_turns, 50); // Default
        assert_eq!(config.venues.len(), 1);
        assert_eq!(config.venues[0].category, VenueCategory::Cafe);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("[model]\nmodle = \"x\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_tables_overlays_nested_keys() {
        let mut user: toml::Table = r#"
            [model]
            model = "gpt-4o"
            temperature = 0.9
            [locale]
            city = "mumbai"
        "#
        .parse()
        .unwrap();
        let project: toml::Table = r#"
            [model]
            temperature = 0.1
        "#
        .parse()
        .unwrap();

        merge_tables(&mut user, project);
        let config: Config = toml::Value::Table(user).try_into().unwrap();

        assert_eq!(config.model.model, "gpt-4o"); // From user
        assert_eq!(config.model.temperature, 0.1); // Project wins
        assert_eq!(config.locale.city.as_deref(), Some("mumbai"));
    }

    #[test]
    fn test_load_config_explicit_path() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("chatrs.toml");
        fs::write(&path, "[transcript]\nmax_turns = 4\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.transcript.max_turns, 4);
        assert_eq!(config.model.model, "gpt-4o-mini");
    }

    #[test]
    fn test_load_config_missing_explicit_path() {
        let temp_dir = tempdir().unwrap();
        let result = load_config(Some(&temp_dir.path().join("nope.toml")));
        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("Failed to read configuration file"));
    }

    #[test]
    fn test_find_project_config_stops_at_git() {
        let temp_dir = tempdir().unwrap();
        let repo = temp_dir.path().join("repo");
        let nested = repo.join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir(repo.join(".git")).unwrap();
        // A config above the repository root must not be picked up.
        fs::write(temp_dir.path().join(PROJECT_CONFIG_FILENAME), "").unwrap();

        assert_eq!(find_project_config_path(&nested), None);

        fs::write(repo.join("a").join(PROJECT_CONFIG_FILENAME), "").unwrap();
        assert_eq!(
            find_project_config_path(&nested),
            Some(repo.join("a").join(PROJECT_CONFIG_FILENAME))
        );
    }

    #[test]
    fn test_validate_config_defaults_are_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_config_invalid_temperature() {
        let mut config = Config::default();
        config.model.temperature = 1.5;
        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must be between 0.0 and 1.0"));
    }

    #[test]
    fn test_validate_config_invalid_offset() {
        let mut config = Config::default();
        config.locale.utc_offset = "somewhere".into();
        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("Invalid locale.utc_offset"));
    }

    #[test]
    fn test_validate_config_cooldown_range() {
        let mut config = Config::default();
        config.model.cooldown_secs = 0;
        assert!(validate_config(&config).is_err());
        config.model.cooldown_secs = MAX_COOLDOWN_SECS + 1;
        let result = validate_config(&config);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("model.cooldown_secs must be between 1"));
        config.model.cooldown_secs = MAX_COOLDOWN_SECS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_config_broken_template() {
        let mut config = Config::default();
        config.replies.time = Some("{{ time".into());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_with_model_overrides() {
        let config = Config::default()
            .with_model_overrides(Some("gpt-4o".into()), Some(0.0), true)
            .unwrap();
        assert_eq!(config.model.model, "gpt-4o");
        assert_eq!(config.model.temperature, 0.0);
        assert!(config.model.stream);

        assert!(Config::default()
            .with_model_overrides(None, Some(-0.1), false)
            .is_err());
    }
}
