//! Environment configuration

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_INVALID_ACTION_PENALTY, DEFAULT_TIME_MAX};
use crate::error::{ProspectorError, Result};

/// Per-instance settings, identical for both implementations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Episode time budget in ticks
    #[serde(default = "default_time_max")]
    pub time_max: f32,

    /// Reward subtracted when an in-range action's preconditions fail
    #[serde(default = "default_invalid_action_penalty")]
    pub invalid_action_penalty: f32,
}

fn default_time_max() -> f32 {
    DEFAULT_TIME_MAX
}

fn default_invalid_action_penalty() -> f32 {
    DEFAULT_INVALID_ACTION_PENALTY
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            time_max: DEFAULT_TIME_MAX,
            invalid_action_penalty: DEFAULT_INVALID_ACTION_PENALTY,
        }
    }
}

impl CoreConfig {
    pub fn with_time_max(time_max: f32) -> Self {
        Self {
            time_max,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.time_max.is_finite() || self.time_max <= 0.0 {
            return Err(ProspectorError::InvalidConfig(format!(
                "time_max must be positive, got {}",
                self.time_max
            )));
        }
        if !self.invalid_action_penalty.is_finite() || self.invalid_action_penalty < 0.0 {
            return Err(ProspectorError::InvalidConfig(format!(
                "invalid_action_penalty must be non-negative, got {}",
                self.invalid_action_penalty
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: CoreConfig = serde_json::from_str(r#"{"time_max": 2000.0}"#).unwrap();
        assert_eq!(config.time_max, 2000.0);
        assert_eq!(config.invalid_action_penalty, DEFAULT_INVALID_ACTION_PENALTY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(CoreConfig::with_time_max(0.0).validate().is_err());
        assert!(CoreConfig::with_time_max(f32::NAN).validate().is_err());
        let config = CoreConfig {
            invalid_action_penalty: -1.0,
            ..CoreConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
