use serde::{de::Error, Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;

/// A duration read from configuration, written as an integer with a unit
/// suffix: `ms`, `s`, `m` or `h` (e.g. `600ms`, `3m`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SettingsDuration(Duration);

impl SettingsDuration {
    pub const fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub const fn from_mins(mins: u64) -> Self {
        Self(Duration::from_secs(mins * 60))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse a duration string such as `30m` or `600ms`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| format!("missing time unit in duration '{s}'"))?;
        let (num, unit) = s.split_at(split);
        if num.is_empty() {
            return Err(format!("missing amount in duration '{s}'"));
        }
        let num: u64 = num
            .parse()
            .map_err(|e| format!("invalid amount in duration '{s}': {e}"))?;

        let secs_per_unit = match unit {
            "ms" => return Ok(Self(Duration::from_millis(num))),
            "s" => 1,
            "m" => 60,
            "h" => 60 * 60,
            _ => return Err(format!("invalid time unit '{unit}' in duration '{s}'")),
        };
        let secs = num
            .checked_mul(secs_per_unit)
            .ok_or_else(|| format!("duration '{s}' is too large"))?;
        Ok(Self(Duration::from_secs(secs)))
    }
}

impl From<SettingsDuration> for Duration {
    fn from(val: SettingsDuration) -> Self {
        val.0
    }
}

impl From<Duration> for SettingsDuration {
    fn from(val: Duration) -> Self {
        Self(val)
    }
}

impl fmt::Debug for SettingsDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl<'de> Deserialize<'de> for SettingsDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        SettingsDuration::parse(&s).map_err(D::Error::custom)
    }
}
