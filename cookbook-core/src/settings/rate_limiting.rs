use serde::Deserialize;
use thiserror::Error;

use super::duration::SettingsDuration;

/// Upper bound for every configured rate limiting duration, one year
pub const MAX_DURATION: SettingsDuration = SettingsDuration::from_mins(365 * 24 * 60);

fn check_upper_bound(
    name: &str,
    value: SettingsDuration,
) -> Result<(), RateLimitingValidationError> {
    if value > MAX_DURATION {
        return Err(RateLimitingValidationError::new(format!(
            "{} must not exceed {:?}",
            name, MAX_DURATION
        )));
    }
    Ok(())
}

/// Rate limiting configuration validation error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Rate limiting configuration error: {message}")]
pub struct RateLimitingValidationError {
    pub message: String,
}

impl RateLimitingValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn scoped(self, scope: &str) -> Self {
        Self {
            message: format!("{}: {}", scope, self.message),
        }
    }
}

/// Rate limiting configuration for the API
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitingConfig {
    /// Global enable/disable switch for all rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Login attempts, blocks the client after the burst is used up
    #[serde(default = "PolicyConfig::login")]
    pub login: PolicyConfig,

    /// Account registration, warn only
    #[serde(default = "PolicyConfig::register")]
    pub register: PolicyConfig,

    /// Recipe search, warn only
    #[serde(default = "PolicyConfig::search")]
    pub search: PolicyConfig,

    /// Everything else, blocks on repeated violation
    #[serde(default = "PolicyConfig::general")]
    pub general: PolicyConfig,

    #[serde(default)]
    pub reaper: ReaperConfig,
}

fn default_enabled() -> bool {
    true
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            login: PolicyConfig::login(),
            register: PolicyConfig::register(),
            search: PolicyConfig::search(),
            general: PolicyConfig::general(),
            reaper: ReaperConfig::default(),
        }
    }
}

impl RateLimitingConfig {
    /// Validate the rate limiting configuration
    pub fn validate(&self) -> Result<(), RateLimitingValidationError> {
        if !self.enabled {
            return Ok(()); // Nothing gets built from a disabled config
        }

        self.login.validate().map_err(|e| e.scoped("login"))?;
        self.register.validate().map_err(|e| e.scoped("register"))?;
        self.search.validate().map_err(|e| e.scoped("search"))?;
        self.general.validate().map_err(|e| e.scoped("general"))?;
        self.reaper.validate().map_err(|e| e.scoped("reaper"))?;

        Ok(())
    }
}

/// Configuration for a single rate limiting policy
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PolicyConfig {
    /// One token is added to the bucket per interval
    pub refill_every: SettingsDuration,

    /// Maximum number of tokens the bucket holds
    pub burst: u32,

    /// Block duration once the client violates the policy, `None` only warns
    #[serde(default)]
    pub block_for: Option<SettingsDuration>,

    /// Consecutive denials needed before the block kicks in
    #[serde(default = "default_block_after_violations")]
    pub block_after_violations: u32,
}

fn default_block_after_violations() -> u32 {
    1
}

impl PolicyConfig {
    pub fn login() -> Self {
        Self {
            refill_every: SettingsDuration::from_mins(3),
            burst: 5,
            block_for: Some(SettingsDuration::from_mins(30)),
            block_after_violations: 1,
        }
    }

    pub fn register() -> Self {
        Self {
            refill_every: SettingsDuration::from_mins(20),
            burst: 3,
            block_for: None,
            block_after_violations: default_block_after_violations(),
        }
    }

    pub fn search() -> Self {
        Self {
            refill_every: SettingsDuration::from_secs(2),
            burst: 30,
            block_for: None,
            block_after_violations: default_block_after_violations(),
        }
    }

    pub fn general() -> Self {
        Self {
            refill_every: SettingsDuration::from_millis(600),
            burst: 100,
            block_for: Some(SettingsDuration::from_mins(30)),
            block_after_violations: 3,
        }
    }

    /// Validate the policy configuration
    pub fn validate(&self) -> Result<(), RateLimitingValidationError> {
        if self.burst == 0 {
            return Err(RateLimitingValidationError::new(
                "burst must be greater than 0",
            ));
        }

        if self.refill_every.is_zero() {
            return Err(RateLimitingValidationError::new(
                "refill_every must be greater than 0",
            ));
        }
        check_upper_bound("refill_every", self.refill_every)?;

        if let Some(block_for) = self.block_for {
            if block_for.is_zero() {
                return Err(RateLimitingValidationError::new(
                    "block_for must be greater than 0 when set",
                ));
            }
            check_upper_bound("block_for", block_for)?;
            if self.block_after_violations == 0 {
                return Err(RateLimitingValidationError::new(
                    "block_after_violations must be greater than 0 when block_for is set",
                ));
            }
        }

        Ok(())
    }
}

/// Configuration of the idle-entry reaper
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ReaperConfig {
    #[serde(default = "default_reaper_interval")]
    pub interval: SettingsDuration,

    /// Limiter entries not seen for longer than this are evicted
    #[serde(default = "default_reaper_retention")]
    pub retention: SettingsDuration,
}

fn default_reaper_interval() -> SettingsDuration {
    SettingsDuration::from_mins(5)
}

fn default_reaper_retention() -> SettingsDuration {
    SettingsDuration::from_mins(30)
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: default_reaper_interval(),
            retention: default_reaper_retention(),
        }
    }
}

impl ReaperConfig {
    pub fn validate(&self) -> Result<(), RateLimitingValidationError> {
        if self.interval.is_zero() {
            return Err(RateLimitingValidationError::new(
                "interval must be greater than 0",
            ));
        }
        if self.retention.is_zero() {
            return Err(RateLimitingValidationError::new(
                "retention must be greater than 0",
            ));
        }
        check_upper_bound("interval", self.interval)?;
        check_upper_bound("retention", self.retention)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(RateLimitingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_policy_table() {
        let config = RateLimitingConfig::default();
        assert_eq!(config.login.burst, 5);
        assert_eq!(config.login.refill_every, SettingsDuration::from_mins(3));
        assert_eq!(config.login.block_for, Some(SettingsDuration::from_mins(30)));
        assert_eq!(config.register.burst, 3);
        assert_eq!(config.register.block_for, None);
        assert_eq!(config.search.refill_every, SettingsDuration::from_secs(2));
        assert_eq!(config.general.refill_every, SettingsDuration::from_millis(600));
        assert_eq!(config.general.block_after_violations, 3);
    }

    #[test]
    fn test_policy_zero_burst_invalid() {
        let config = PolicyConfig {
            burst: 0,
            ..PolicyConfig::search()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policy_zero_refill_invalid() {
        let config = PolicyConfig {
            refill_every: SettingsDuration::from_secs(0),
            ..PolicyConfig::search()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policy_block_without_violations_invalid() {
        let config = PolicyConfig {
            block_after_violations: 0,
            ..PolicyConfig::login()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overlong_durations_invalid() {
        let config = PolicyConfig {
            block_for: Some(SettingsDuration::parse("6000000h").unwrap()),
            ..PolicyConfig::login()
        };
        let err = config.validate().unwrap_err();
        assert!(err.message.contains("block_for"), "{}", err);

        let config = PolicyConfig {
            refill_every: SettingsDuration::parse("9000h").unwrap(),
            ..PolicyConfig::search()
        };
        assert!(config.validate().is_err());

        let config = ReaperConfig {
            retention: SettingsDuration::parse("9000h").unwrap(),
            ..ReaperConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PolicyConfig {
            block_for: Some(MAX_DURATION),
            ..PolicyConfig::login()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disabled_config_skips_validation() {
        let config = RateLimitingConfig {
            enabled: false,
            login: PolicyConfig {
                burst: 0, // Invalid, but should be skipped
                ..PolicyConfig::login()
            },
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_error_names_the_policy() {
        let config = RateLimitingConfig {
            general: PolicyConfig {
                burst: 0,
                ..PolicyConfig::general()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.message.starts_with("general:"), "{}", err);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: RateLimitingConfig = config::Config::builder()
            .set_override("login.refill_every", "1m")
            .unwrap()
            .set_override("login.burst", 2)
            .unwrap()
            .set_override("reaper.retention", "10m")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(config.enabled);
        assert_eq!(config.login.burst, 2);
        assert_eq!(config.login.block_for, None);
        assert_eq!(config.search, PolicyConfig::search());
        assert_eq!(config.reaper.retention, SettingsDuration::from_mins(10));
        assert_eq!(config.reaper.interval, SettingsDuration::from_mins(5));
    }
}
