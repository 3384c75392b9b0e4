//! Provider configuration
//!
//! Credentials and region for the OCI API, loaded from a JSON block or from
//! the `OCI_*` environment variables.

use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use netform_core::crud::Timeouts;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::schemas::types::is_ocid;

pub const ENV_TENANCY_OCID: &str = "OCI_TENANCY_OCID";
pub const ENV_USER_OCID: &str = "OCI_USER_OCID";
pub const ENV_FINGERPRINT: &str = "OCI_FINGERPRINT";
pub const ENV_PRIVATE_KEY_PATH: &str = "OCI_PRIVATE_KEY_PATH";
pub const ENV_PRIVATE_KEY_PASSWORD: &str = "OCI_PRIVATE_KEY_PASSWORD";
pub const ENV_REGION: &str = "OCI_REGION";

static FINGERPRINT: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^([0-9a-f]{2}:){15}[0-9a-f]{2}$"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid provider configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} is not a valid OCID: {value}")]
    InvalidOcid { field: &'static str, value: String },

    #[error("fingerprint must be 16 colon-separated hex pairs, got {0}")]
    InvalidFingerprint(String),
}

/// Per-operation timeouts in minutes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<u64>,
}

impl TimeoutsConfig {
    /// Override the operations set here, keep `base` for the others
    pub fn apply(&self, base: Timeouts) -> Timeouts {
        let minutes = |m: Option<u64>, default: Duration| {
            m.map(|m| Duration::from_secs(m.saturating_mul(60)))
                .unwrap_or(default)
        };

        Timeouts {
            create: minutes(self.create, base.create),
            update: minutes(self.update, base.update),
            delete: minutes(self.delete, base.delete),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub tenancy_ocid: String,
    pub user_ocid: String,
    pub fingerprint: String,
    pub private_key_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_password: Option<String>,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts: Option<TimeoutsConfig>,
}

impl ProviderConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from a variable lookup (environment or a fixture)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingEnv(name))
        };

        Ok(Self {
            tenancy_ocid: required(ENV_TENANCY_OCID)?,
            user_ocid: required(ENV_USER_OCID)?,
            fingerprint: required(ENV_FINGERPRINT)?,
            private_key_path: PathBuf::from(required(ENV_PRIVATE_KEY_PATH)?),
            private_key_password: lookup(ENV_PRIVATE_KEY_PASSWORD).filter(|v| !v.is_empty()),
            region: required(ENV_REGION)?,
            timeouts: None,
        })
    }

    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        Ok(Self::deserialize(value)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("tenancy_ocid", &self.tenancy_ocid),
            ("user_ocid", &self.user_ocid),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Empty(field));
            }
            if !is_ocid(value) {
                return Err(ConfigError::InvalidOcid {
                    field,
                    value: value.clone(),
                });
            }
        }

        let fingerprint_ok = FINGERPRINT
            .as_ref()
            .is_ok_and(|re| re.is_match(&self.fingerprint));
        if !fingerprint_ok {
            return Err(ConfigError::InvalidFingerprint(self.fingerprint.clone()));
        }

        if self.private_key_path.as_os_str().is_empty() {
            return Err(ConfigError::Empty("private_key_path"));
        }
        if self.region.is_empty() {
            return Err(ConfigError::Empty("region"));
        }

        Ok(())
    }

    /// Timeouts of a resource type: the configured values override `declared`
    pub fn resolve_timeouts(&self, declared: Timeouts) -> Timeouts {
        match &self.timeouts {
            Some(t) => t.apply(declared),
            None => declared,
        }
    }
}
