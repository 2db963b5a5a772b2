//! Application-level configuration loading: default match rules, viewer queues and the scorer token.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::rules::MatchRules;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "COURTSIDE_BACK_CONFIG_PATH";
/// Environment variable holding the token scorers must present.
const SCORER_TOKEN_ENV: &str = "COURTSIDE_SCORER_TOKEN";
/// Events buffered per viewer before new ones are dropped for it.
const DEFAULT_SUBSCRIBER_CAPACITY: usize = 32;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    rules: MatchRules,
    subscriber_capacity: usize,
    scorer_token: String,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    RawConfig::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                RawConfig::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                RawConfig::default()
            }
        };

        let env_token = env::var(SCORER_TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty());
        Self::from_raw(raw, env_token)
    }

    /// Rules applied to matches scheduled without their own.
    pub fn default_rules(&self) -> &MatchRules {
        &self.rules
    }

    /// Queue length of each viewer stream.
    pub fn subscriber_capacity(&self) -> usize {
        self.subscriber_capacity
    }

    /// Token expected in the scorer header.
    pub fn scorer_token(&self) -> &str {
        &self.scorer_token
    }

    /// Configuration with a fixed token, used by tests and tools.
    pub fn with_scorer_token(token: impl Into<String>) -> Self {
        Self {
            rules: MatchRules::default(),
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            scorer_token: token.into(),
        }
    }

    fn from_raw(raw: RawConfig, env_token: Option<String>) -> Self {
        let rules = match raw.rules {
            Some(rules) => match rules.validate() {
                Ok(()) => rules,
                Err(err) => {
                    warn!(error = %err, "configured match rules rejected; using defaults");
                    MatchRules::default()
                }
            },
            None => MatchRules::default(),
        };

        let subscriber_capacity = match raw.subscriber_capacity {
            Some(0) => {
                warn!("subscriber capacity must be positive; using default");
                DEFAULT_SUBSCRIBER_CAPACITY
            }
            Some(capacity) => capacity,
            None => DEFAULT_SUBSCRIBER_CAPACITY,
        };

        let scorer_token = match env_token.or(raw.scorer_token) {
            Some(token) => token,
            None => {
                let token = Uuid::new_v4().simple().to_string();
                warn!(%token, "no scorer token configured; generated one for this run");
                token
            }
        };

        Self {
            rules,
            subscriber_capacity,
            scorer_token,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_raw(RawConfig::default(), None)
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    rules: Option<MatchRules>,
    #[serde(default)]
    subscriber_capacity: Option<usize>,
    #[serde(default)]
    scorer_token: Option<String>,
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
