#![forbid(unsafe_code)]

//! Configuration handed to `boot()` as a JSON string.
//!
//! The object may name a base `"profile"` (`"aggressive"` or
//! `"conservative"`); every other key overrides one field of that profile.
//! Unknown keys are ignored. A config that fails to parse or validate is
//! replaced by the defaults and the error is returned alongside for logging.
//!
//! ```json
//! { "profile": "conservative", "retry_interval_ms": 2000, "log_level": "debug" }
//! ```

use feedfollow_core::{ConfigError, FollowConfig};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why the supplied configuration was not used.
#[derive(Debug, Error)]
pub enum BootConfigError {
    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config must be a JSON object")]
    NotAnObject,
    #[error("unknown profile `{0}`")]
    UnknownProfile(String),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Named starting point for overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Aggressive,
    Conservative,
}

impl Profile {
    fn parse(name: &str) -> Result<Self, BootConfigError> {
        match name {
            "aggressive" | "default" => Ok(Self::Aggressive),
            "conservative" => Ok(Self::Conservative),
            other => Err(BootConfigError::UnknownProfile(other.to_owned())),
        }
    }

    #[must_use]
    pub fn config(self) -> FollowConfig {
        match self {
            Self::Aggressive => FollowConfig::aggressive(),
            Self::Conservative => FollowConfig::conservative(),
        }
    }
}

/// Parse and validate `json`. `None` or blank input yields the defaults.
pub fn parse(json: Option<&str>) -> Result<FollowConfig, BootConfigError> {
    let Some(json) = json.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(FollowConfig::default());
    };
    let Value::Object(mut overrides) = serde_json::from_str::<Value>(json)? else {
        return Err(BootConfigError::NotAnObject);
    };
    let profile = match overrides.remove("profile") {
        None => Profile::Aggressive,
        Some(Value::String(name)) => Profile::parse(&name)?,
        Some(other) => return Err(BootConfigError::UnknownProfile(other.to_string())),
    };

    let Value::Object(mut merged) = serde_json::to_value(profile.config())? else {
        return Err(BootConfigError::NotAnObject);
    };
    merge(&mut merged, overrides);
    let config: FollowConfig = serde_json::from_value(Value::Object(merged))?;
    config.validate()?;
    Ok(config)
}

/// [`parse`], falling back to the defaults on error.
pub fn load(json: Option<&str>) -> (FollowConfig, Option<BootConfigError>) {
    match parse(json) {
        Ok(config) => (config, None),
        Err(err) => (FollowConfig::default(), Some(err)),
    }
}

/// Shallow merge, except that nested objects (`indicator`, `toggle_chord`)
/// are merged key by key.
fn merge(base: &mut Map<String, Value>, overrides: Map<String, Value>) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(inner)), Value::Object(patch)) => merge(inner, patch),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
