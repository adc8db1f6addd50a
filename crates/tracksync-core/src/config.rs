//! Configuration loaded from `TRACKSYNC_*` environment variables.
//!
//! Values are trimmed; an empty value counts as unset.

use std::time::Duration;

use thiserror::Error;

use crate::domain::DEFAULT_TRIGGERING_LABEL;

pub const DEFAULT_TRACKER_API_URL: &str = "https://www.pivotaltracker.com/services/v5";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_ETA_LEAD_DAYS: i64 = 2;
const DEFAULT_LEASE_TIMEOUT_SECS: u64 = 900;
const DEFAULT_MAX_CLAIMS: u32 = 3;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

const ENV_TRACKER_TOKEN: &str = "TRACKSYNC_TRACKER_TOKEN";
const ENV_TRACKER_PROJECT_ID: &str = "TRACKSYNC_TRACKER_PROJECT_ID";
const ENV_TRACKER_API_URL: &str = "TRACKSYNC_TRACKER_API_URL";
const ENV_GITHUB_TOKEN: &str = "TRACKSYNC_GITHUB_TOKEN";
const ENV_GITHUB_REPOSITORY: &str = "TRACKSYNC_GITHUB_REPOSITORY";
const ENV_GITHUB_API_URL: &str = "TRACKSYNC_GITHUB_API_URL";
const ENV_TRIGGERING_LABEL: &str = "TRACKSYNC_TRIGGERING_LABEL";
const ENV_ETA_LEAD_DAYS: &str = "TRACKSYNC_ETA_LEAD_DAYS";
const ENV_LEASE_TIMEOUT_SECS: &str = "TRACKSYNC_LEASE_TIMEOUT_SECS";
const ENV_MAX_CLAIMS: &str = "TRACKSYNC_MAX_CLAIMS";
const ENV_HTTP_TIMEOUT_SECS: &str = "TRACKSYNC_HTTP_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to build {service} HTTP client: {reason}")]
    HttpClient {
        service: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub api_url: String,
    pub token: String,
    pub project_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubConfig {
    pub api_url: String,
    pub token: String,
    /// `owner/repo`
    pub repository: String,
}

/// Engine tunables. Everything here has a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub triggering_label: String,
    pub eta_lead_days: i64,
    pub lease_timeout: Duration,
    pub max_claims: u32,
    pub http_timeout: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            triggering_label: DEFAULT_TRIGGERING_LABEL.to_owned(),
            eta_lead_days: DEFAULT_ETA_LEAD_DAYS,
            lease_timeout: Duration::from_secs(DEFAULT_LEASE_TIMEOUT_SECS),
            max_claims: DEFAULT_MAX_CLAIMS,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub tracker: TrackerConfig,
    pub github: GitHubConfig,
    pub settings: SyncSettings,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let required = |key: &'static str| read(key).ok_or(ConfigError::Missing(key));

        let tracker = TrackerConfig {
            api_url: read(ENV_TRACKER_API_URL)
                .unwrap_or_else(|| DEFAULT_TRACKER_API_URL.to_owned()),
            token: required(ENV_TRACKER_TOKEN)?,
            project_id: parse_positive(ENV_TRACKER_PROJECT_ID, &required(ENV_TRACKER_PROJECT_ID)?)?,
        };

        let repository = required(ENV_GITHUB_REPOSITORY)?;
        validate_repository(&repository)?;
        let github = GitHubConfig {
            api_url: read(ENV_GITHUB_API_URL).unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_owned()),
            token: required(ENV_GITHUB_TOKEN)?,
            repository,
        };

        let defaults = SyncSettings::default();
        let settings = SyncSettings {
            triggering_label: read(ENV_TRIGGERING_LABEL).unwrap_or(defaults.triggering_label),
            eta_lead_days: read(ENV_ETA_LEAD_DAYS)
                .map(|raw| {
                    raw.parse::<i64>().map_err(|error| ConfigError::Invalid {
                        key: ENV_ETA_LEAD_DAYS,
                        reason: error.to_string(),
                    })
                })
                .transpose()?
                .unwrap_or(defaults.eta_lead_days),
            lease_timeout: read(ENV_LEASE_TIMEOUT_SECS)
                .map(|raw| parse_positive(ENV_LEASE_TIMEOUT_SECS, &raw).map(Duration::from_secs))
                .transpose()?
                .unwrap_or(defaults.lease_timeout),
            max_claims: read(ENV_MAX_CLAIMS)
                .map(|raw| parse_positive(ENV_MAX_CLAIMS, &raw))
                .transpose()?
                .unwrap_or(defaults.max_claims),
            http_timeout: read(ENV_HTTP_TIMEOUT_SECS)
                .map(|raw| parse_positive(ENV_HTTP_TIMEOUT_SECS, &raw).map(Duration::from_secs))
                .transpose()?
                .unwrap_or(defaults.http_timeout),
        };

        Ok(Self {
            tracker,
            github,
            settings,
        })
    }
}

fn parse_positive<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
{
    let value = raw.parse::<T>().map_err(|error| ConfigError::Invalid {
        key,
        reason: error.to_string(),
    })?;
    if value == T::default() {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be greater than zero".to_owned(),
        });
    }
    Ok(value)
}

fn validate_repository(repository: &str) -> Result<(), ConfigError> {
    match repository.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(())
        }
        _ => Err(ConfigError::Invalid {
            key: ENV_GITHUB_REPOSITORY,
            reason: format!("expected `owner/repo`, got `{repository}`"),
        }),
    }
}
