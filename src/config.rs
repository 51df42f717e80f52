use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::application::consolidation::DEFAULT_CONSOLIDATION_THRESHOLD;
use crate::application::dispatcher::{DEFAULT_ERROR_COOLDOWN, DEFAULT_POLL_INTERVAL};
use crate::application::outbox_service::DEFAULT_BATCH_SIZE;
use crate::domain::outbox::DEFAULT_MAX_RETRIES;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionMode {
    Mock,
    Http { base_url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionConfig {
    pub mode: SubmissionMode,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub mock_failure_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    pub instance_id: String,
    pub consolidation_threshold: i64,
    pub batch_size: i64,
    pub max_retries: i32,
    pub poll_interval: Duration,
    pub error_cooldown: Duration,
    pub fail_fast_permanent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub dispatch: DispatchConfig,
    pub submission: SubmissionConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, which returns the raw value of
    /// a variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let database_url = vars
            .string("DATABASE_URL")
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let threshold: i64 = vars.parse("CONSOLIDATION_THRESHOLD", DEFAULT_CONSOLIDATION_THRESHOLD)?;
        if threshold <= 0 {
            return Err(vars.invalid("CONSOLIDATION_THRESHOLD"));
        }
        let batch_size: i64 = vars.parse("OUTBOX_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size <= 0 {
            return Err(vars.invalid("OUTBOX_BATCH_SIZE"));
        }
        let max_retries: i32 = vars.parse("OUTBOX_MAX_RETRIES", DEFAULT_MAX_RETRIES)?;
        if max_retries < 0 {
            return Err(vars.invalid("OUTBOX_MAX_RETRIES"));
        }

        let dispatch = DispatchConfig {
            instance_id: vars
                .string("INSTANCE_ID")
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            consolidation_threshold: threshold,
            batch_size,
            max_retries,
            poll_interval: Duration::from_secs(
                vars.parse("OUTBOX_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL.as_secs())?,
            ),
            error_cooldown: Duration::from_secs(
                vars.parse("OUTBOX_ERROR_COOLDOWN_SECS", DEFAULT_ERROR_COOLDOWN.as_secs())?,
            ),
            fail_fast_permanent: vars.parse("OUTBOX_FAIL_FAST_PERMANENT", false)?,
        };

        let mode = match vars.string("SUBMISSION_MODE").as_deref() {
            None | Some("mock") => SubmissionMode::Mock,
            Some("http") => SubmissionMode::Http {
                base_url: vars
                    .string("SUBMISSION_BASE_URL")
                    .ok_or(ConfigError::Missing("SUBMISSION_BASE_URL"))?,
            },
            Some(_) => return Err(vars.invalid("SUBMISSION_MODE")),
        };
        let mock_failure_rate: f64 = vars.parse("SUBMISSION_MOCK_FAILURE_RATE", 0.3)?;
        if !(0.0..=1.0).contains(&mock_failure_rate) {
            return Err(vars.invalid("SUBMISSION_MOCK_FAILURE_RATE"));
        }

        let submission = SubmissionConfig {
            mode,
            timeout: Duration::from_secs(vars.parse("SUBMISSION_TIMEOUT_SECS", 30)?),
            max_retries: vars.parse("SUBMISSION_MAX_RETRIES", 3)?,
            retry_base_delay: Duration::from_millis(
                vars.parse("SUBMISSION_RETRY_BASE_MILLIS", 1000)?,
            ),
            mock_failure_rate,
        };

        Ok(Self {
            database_url,
            host: vars.string("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: vars.parse("PORT", 8080)?,
            dispatch,
            submission,
        })
    }
}

struct Vars<F>(F);

impl<F: Fn(&'static str) -> Option<String>> Vars<F> {
    fn string(&self, name: &'static str) -> Option<String> {
        (self.0)(name).filter(|v| !v.trim().is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.string(name) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name,
                value: raw,
            }),
        }
    }

    fn invalid(&self, name: &'static str) -> ConfigError {
        ConfigError::Invalid {
            name,
            value: self.string(name).unwrap_or_default(),
        }
    }
}
