use std::fmt;
use std::time::Duration;

use cookbook_core::settings::rate_limiting::{
    PolicyConfig, RateLimitingConfig, RateLimitingValidationError, MAX_DURATION,
};

/// Traffic class a guarded route belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    Login,
    Register,
    Search,
    General,
}

impl Policy {
    pub const ALL: [Policy; 4] = [
        Policy::Login,
        Policy::Register,
        Policy::Search,
        Policy::General,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Policy::Login => "login",
            Policy::Register => "register",
            Policy::Search => "search",
            Policy::General => "general",
        }
    }

    /// Position in `Policy::ALL`
    pub(crate) fn index(&self) -> usize {
        match self {
            Policy::Login => 0,
            Policy::Register => 1,
            Policy::Search => 2,
            Policy::General => 3,
        }
    }

    pub(crate) fn config<'a>(&self, config: &'a RateLimitingConfig) -> &'a PolicyConfig {
        match self {
            Policy::Login => &config.login,
            Policy::Register => &config.register,
            Policy::Search => &config.search,
            Policy::General => &config.general,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// When and for how long a policy violation turns into a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRule {
    pub duration: Duration,
    pub after_violations: u32,
}

/// Validated bucket parameters of a policy.
///
/// A `PolicyParams` can only be built with a non-zero refill interval and
/// burst, so every bucket created from it both admits and throttles.
/// Intervals and block durations are capped at `MAX_DURATION`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyParams {
    refill_every: Duration,
    burst: u32,
    block: Option<BlockRule>,
}

impl PolicyParams {
    pub fn new(
        refill_every: Duration,
        burst: u32,
        block: Option<BlockRule>,
    ) -> Result<Self, RateLimitingValidationError> {
        if burst == 0 {
            return Err(RateLimitingValidationError::new(
                "burst must be greater than 0",
            ));
        }
        if refill_every.is_zero() {
            return Err(RateLimitingValidationError::new(
                "refill_every must be greater than 0",
            ));
        }
        let max = MAX_DURATION.as_duration();
        if refill_every > max {
            return Err(RateLimitingValidationError::new(
                "refill_every is longer than the supported maximum",
            ));
        }
        if let Some(rule) = block {
            if rule.duration.is_zero() || rule.after_violations == 0 {
                return Err(RateLimitingValidationError::new(
                    "block duration and violation threshold must be greater than 0",
                ));
            }
            if rule.duration > max {
                return Err(RateLimitingValidationError::new(
                    "block duration is longer than the supported maximum",
                ));
            }
        }

        Ok(Self {
            refill_every,
            burst,
            block,
        })
    }

    pub fn refill_every(&self) -> Duration {
        self.refill_every
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    pub fn block(&self) -> Option<BlockRule> {
        self.block
    }
}

impl TryFrom<&PolicyConfig> for PolicyParams {
    type Error = RateLimitingValidationError;

    fn try_from(config: &PolicyConfig) -> Result<Self, Self::Error> {
        config.validate()?;
        let block = config.block_for.map(|duration| BlockRule {
            duration: duration.as_duration(),
            after_violations: config.block_after_violations,
        });
        PolicyParams::new(config.refill_every.as_duration(), config.burst, block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_all_order() {
        for (i, policy) in Policy::ALL.iter().enumerate() {
            assert_eq!(policy.index(), i);
        }
    }

    #[test]
    fn test_params_from_login_defaults() {
        let params = PolicyParams::try_from(&PolicyConfig::login()).unwrap();
        assert_eq!(params.burst(), 5);
        assert_eq!(params.refill_every(), Duration::from_secs(180));
        assert_eq!(
            params.block(),
            Some(BlockRule {
                duration: Duration::from_secs(30 * 60),
                after_violations: 1,
            })
        );
    }

    #[test]
    fn test_params_reject_zero_values() {
        assert!(PolicyParams::new(Duration::ZERO, 5, None).is_err());
        assert!(PolicyParams::new(Duration::from_secs(1), 0, None).is_err());
        assert!(PolicyParams::new(
            Duration::from_secs(1),
            5,
            Some(BlockRule {
                duration: Duration::from_secs(60),
                after_violations: 0,
            })
        )
        .is_err());
    }

    #[test]
    fn test_params_reject_overlong_durations() {
        let too_long = MAX_DURATION.as_duration() + Duration::from_secs(1);
        assert!(PolicyParams::new(too_long, 5, None).is_err());
        assert!(PolicyParams::new(
            Duration::from_secs(1),
            5,
            Some(BlockRule {
                duration: too_long,
                after_violations: 1,
            })
        )
        .is_err());
    }
}
