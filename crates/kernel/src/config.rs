//! Engine configuration and runtime settings.
//!
//! Settings arrive either from a config file (all at once, validated as a
//! whole) or one at a time through [`Setting`]s carrying a dynamically typed
//! [`ConfigValue`]. A rejected value never mutates the configuration.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors from configuration loading and runtime settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("setting `{setting}` expects a {expected}, got a {actual}")]
    WrongKind {
        setting: Setting,
        expected: ValueKind,
        actual: ValueKind,
    },
    #[error("setting `{setting}` rejects {value}: {reason}")]
    OutOfDomain {
        setting: Setting,
        value: String,
        reason: &'static str,
    },
    #[error("unknown setting `{0}`")]
    UnknownSetting(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Engine-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Target tick rate in ticks per second.
    pub max_rate: f64,
    /// Floor rate; slower ticks are clamped and their time banked as lag.
    pub min_rate: f64,
    /// Simulation speed multiplier.
    pub speed: f64,
    /// Repay banked lag over later ticks.
    pub catch_up: bool,
    /// Maximum lag repaid per tick, in seconds.
    pub catch_up_budget: f64,
    /// Interval after which the tick source is torn down and recreated.
    pub clear_interval_ms: f64,
    /// Delay before a torn-down tick source is re-armed.
    pub restart_delay_ms: f64,
    /// Consecutive overruns before a warning is emitted.
    pub overrun_alert: u32,
    pub zoom: f64,
    pub debug: bool,
    pub gravity: f64,
    pub background: String,
    pub text_color: String,
    /// One-shot worker requests unanswered for this long are dropped. `None` waits forever.
    pub request_timeout_ms: Option<f64>,
    pub console_capacity: usize,
    pub correlation_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_rate: 60.0,
            min_rate: 20.0,
            speed: 1.0,
            catch_up: false,
            catch_up_budget: 1.0 / 8.0,
            clear_interval_ms: 10_000.0,
            restart_delay_ms: 40.0,
            overrun_alert: 50,
            zoom: 1.0,
            debug: true,
            gravity: 10.0,
            background: "#FFF".to_string(),
            text_color: "black".to_string(),
            request_timeout_ms: Some(5_000.0),
            console_capacity: 256,
            correlation_prefix: "CBI".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check the whole configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be positive, got {v}")))
            }
        };
        positive("max_rate", self.max_rate)?;
        positive("min_rate", self.min_rate)?;
        positive("zoom", self.zoom)?;
        positive("clear_interval_ms", self.clear_interval_ms)?;
        if !(self.speed.is_finite() && self.speed >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "speed must be non-negative, got {}",
                self.speed
            )));
        }
        if !(self.catch_up_budget.is_finite() && self.catch_up_budget >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "catch_up_budget must be non-negative, got {}",
                self.catch_up_budget
            )));
        }
        if !(self.restart_delay_ms.is_finite() && self.restart_delay_ms >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "restart_delay_ms must be non-negative, got {}",
                self.restart_delay_ms
            )));
        }
        if !self.gravity.is_finite() {
            return Err(ConfigError::Invalid("gravity must be finite".into()));
        }
        if let Some(t) = self.request_timeout_ms {
            positive("request_timeout_ms", t)?;
        }
        if self.console_capacity == 0 {
            return Err(ConfigError::Invalid("console_capacity must be at least 1".into()));
        }
        Ok(())
    }

    /// Validate `value` against `setting` and store it.
    pub fn apply(&mut self, setting: Setting, value: &ConfigValue) -> Result<(), ConfigError> {
        let kind = setting.kind();
        let reject = |reason| ConfigError::OutOfDomain {
            setting,
            value: value.to_string(),
            reason,
        };
        match (setting, value) {
            (Setting::Zoom, ConfigValue::Number(v)) => {
                if !(v.is_finite() && *v > 0.0) {
                    return Err(reject("zoom must be greater than zero"));
                }
                self.zoom = *v;
            }
            (Setting::MaxRate, ConfigValue::Number(v)) => {
                if !(v.is_finite() && *v > 0.0) {
                    return Err(reject("tick rate must be greater than zero"));
                }
                self.max_rate = *v;
            }
            (Setting::Speed, ConfigValue::Number(v)) => {
                if !(v.is_finite() && *v >= 0.0) {
                    return Err(reject("speed must be a non-negative number"));
                }
                self.speed = *v;
            }
            (Setting::Gravity, ConfigValue::Number(v)) => {
                if !v.is_finite() {
                    return Err(reject("gravity must be finite"));
                }
                self.gravity = *v;
            }
            (Setting::Debug, ConfigValue::Bool(b)) => self.debug = *b,
            (Setting::CatchUp, ConfigValue::Bool(b)) => self.catch_up = *b,
            (Setting::Background, ConfigValue::Text(s)) => {
                if s.trim().is_empty() {
                    return Err(reject("color must not be empty"));
                }
                self.background = s.clone();
            }
            (Setting::TextColor, ConfigValue::Text(s)) => {
                if s.trim().is_empty() {
                    return Err(reject("color must not be empty"));
                }
                self.text_color = s.clone();
            }
            (_, other) => {
                return Err(ConfigError::WrongKind {
                    setting,
                    expected: kind,
                    actual: other.kind(),
                });
            }
        }
        Ok(())
    }
}

/// The declared type of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Number,
    Bool,
    Text,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Number => "number",
            ValueKind::Bool => "boolean",
            ValueKind::Text => "string",
        })
    }
}

/// A dynamically typed setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl ConfigValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ConfigValue::Number(_) => ValueKind::Number,
            ConfigValue::Bool(_) => ValueKind::Bool,
            ConfigValue::Text(_) => ValueKind::Text,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Number(v) => write!(f, "{v}"),
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Number(v)
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Text(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::Text(v)
    }
}

/// Settings that can be changed while the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    Zoom,
    MaxRate,
    Debug,
    Speed,
    Gravity,
    CatchUp,
    Background,
    TextColor,
}

impl Setting {
    pub const ALL: [Setting; 8] = [
        Setting::Zoom,
        Setting::MaxRate,
        Setting::Debug,
        Setting::Speed,
        Setting::Gravity,
        Setting::CatchUp,
        Setting::Background,
        Setting::TextColor,
    ];

    pub fn kind(&self) -> ValueKind {
        match self {
            Setting::Zoom | Setting::MaxRate | Setting::Speed | Setting::Gravity => {
                ValueKind::Number
            }
            Setting::Debug | Setting::CatchUp => ValueKind::Bool,
            Setting::Background | Setting::TextColor => ValueKind::Text,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Setting::Zoom => "zoom",
            Setting::MaxRate => "maxRate",
            Setting::Debug => "debug",
            Setting::Speed => "speed",
            Setting::Gravity => "gravity",
            Setting::CatchUp => "catchUp",
            Setting::Background => "background",
            Setting::TextColor => "textColor",
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Setting {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Setting::ALL
            .into_iter()
            .find(|setting| setting.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownSetting(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_rate, 60.0);
        assert_eq!(config.min_rate, 20.0);
        assert_eq!(config.catch_up_budget, 0.125);
        assert_eq!(config.clear_interval_ms, 10_000.0);
        assert_eq!(config.restart_delay_ms, 40.0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = EngineConfig::from_json_str(r#"{ "max_rate": 30, "catch_up": true }"#).unwrap();
        assert_eq!(config.max_rate, 30.0);
        assert!(config.catch_up);
        assert_eq!(config.min_rate, 20.0);
    }

    #[test]
    fn invalid_json_config_is_rejected() {
        assert!(EngineConfig::from_json_str(r#"{ "max_rate": 0 }"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{ "speed": -1 }"#).is_err());
        assert!(EngineConfig::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn wrong_kind_is_rejected_without_mutation() {
        let mut config = EngineConfig::default();
        let err = config
            .apply(Setting::Zoom, &ConfigValue::from("big"))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::WrongKind {
                expected: ValueKind::Number,
                actual: ValueKind::Text,
                ..
            }
        ));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn non_positive_zoom_is_rejected() {
        let mut config = EngineConfig::default();
        assert!(config.apply(Setting::Zoom, &0.0.into()).is_err());
        assert!(config.apply(Setting::Zoom, &(-2.0).into()).is_err());
        assert_eq!(config.zoom, 1.0);
        config.apply(Setting::Zoom, &2.5.into()).unwrap();
        assert_eq!(config.zoom, 2.5);
    }

    #[test]
    fn every_setting_accepts_its_kind() {
        let mut config = EngineConfig::default();
        config.apply(Setting::MaxRate, &30.0.into()).unwrap();
        config.apply(Setting::Debug, &false.into()).unwrap();
        config.apply(Setting::Speed, &2.0.into()).unwrap();
        config.apply(Setting::Gravity, &9.8.into()).unwrap();
        config.apply(Setting::CatchUp, &true.into()).unwrap();
        config.apply(Setting::Background, &"#000".into()).unwrap();
        config.apply(Setting::TextColor, &"white".into()).unwrap();
        assert_eq!(config.max_rate, 30.0);
        assert!(!config.debug);
        assert_eq!(config.speed, 2.0);
        assert_eq!(config.gravity, 9.8);
        assert!(config.catch_up);
        assert_eq!(config.background, "#000");
        assert_eq!(config.text_color, "white");
    }

    #[test]
    fn setting_names_round_trip() {
        for setting in Setting::ALL {
            assert_eq!(setting.name().parse::<Setting>().unwrap(), setting);
        }
        assert!("warp".parse::<Setting>().is_err());
    }

    #[test]
    fn config_value_deserializes_untagged() {
        let v: ConfigValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, ConfigValue::Bool(true));
        let v: ConfigValue = serde_json::from_str("1.5").unwrap();
        assert_eq!(v, ConfigValue::Number(1.5));
        let v: ConfigValue = serde_json::from_str("\"#FFF\"").unwrap();
        assert_eq!(v.kind(), ValueKind::Text);
    }
}
