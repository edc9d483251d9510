//! Static application configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings fixed for the lifetime of an app instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Locale used for number grouping and dates, e.g. `en-IN`
    pub locale: String,
    /// ISO currency code, e.g. `INR`
    pub currency: String,
    /// Identity protected from revocation
    pub admin_privilege: String,
    /// Duration of view transitions
    pub anim_duration_ms: u64,
    /// Period of the insight banner rotation
    pub insight_interval_ms: u64,
    /// Token that must be typed to purge a ledger
    pub purge_token: String,
    /// Avatar service used when the user has no photo
    pub avatar_fallback_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            locale: "en-IN".to_string(),
            currency: "INR".to_string(),
            admin_privilege: String::new(),
            anim_duration_ms: 500,
            insight_interval_ms: 8000,
            purge_token: "PURGE".to_string(),
            avatar_fallback_url: "https://ui-avatars.com/api/?name=".to_string(),
        }
    }
}

impl AppConfig {
    pub fn with_admin(mut self, email: impl Into<String>) -> Self {
        self.admin_privilege = email.into().to_lowercase();
        self
    }

    /// Parse a JSON config; absent fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(json).map_err(|e| ConfigError::Malformed {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_empty = [
            ("locale", &self.locale),
            ("currency", &self.currency),
            ("purge_token", &self.purge_token),
        ];
        for (field, value) in non_empty {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidField {
                    field: field.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }
        if !self.admin_privilege.contains('@') {
            return Err(ConfigError::InvalidField {
                field: "admin_privilege".to_string(),
                reason: "must name the root admin email".to_string(),
            });
        }
        if self.insight_interval_ms == 0 {
            return Err(ConfigError::InvalidField {
                field: "insight_interval_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_admin(&self, email: &str) -> bool {
        !self.admin_privilege.is_empty() && self.admin_privilege.eq_ignore_ascii_case(email)
    }
}
