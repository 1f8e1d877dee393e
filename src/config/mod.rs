//! Configuration (layered: code > env > TOML file > defaults).

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::agent::{RunConfig, StreamingMode};
use crate::compaction::CompactionSettings;
use crate::error::BraidError;

const MAX_LLM_CALLS_ENV: &str = "BRAID_MAX_LLM_CALLS";
const STREAMING_ENV: &str = "BRAID_STREAMING";
const REPORT_UNKNOWN_TOOLS_ENV: &str = "BRAID_REPORT_UNKNOWN_TOOLS";
const COMPACTION_INTERVAL_ENV: &str = "BRAID_COMPACTION_INTERVAL";
const COMPACTION_OVERLAP_ENV: &str = "BRAID_COMPACTION_OVERLAP";
const COMPACTION_ENABLED_ENV: &str = "BRAID_COMPACTION_ENABLED";

/// Runtime configuration.
///
/// ```
/// use braid::config::BraidConfig;
///
/// let config = BraidConfig::from_toml_str(
///     r#"
///     [run]
///     max_llm_calls = 20
///     streaming_mode = "sse"
///
///     [compaction]
///     enabled = true
///     interval = 4
///     overlap = 1
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.run.max_llm_calls, 20);
/// assert!(config.compaction.enabled);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BraidConfig {
    pub run: RunConfig,
    pub compaction: CompactionSettings,
}

impl BraidConfig {
    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, BraidError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BraidError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::from_toml_str(&raw)?.with_env_overrides())
    }

    /// Defaults with environment overrides (`.env` honored when present).
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `BRAID_*` variables. Unparseable or invalid values are ignored.
    pub fn with_env_overrides(self) -> Self {
        let _ = dotenvy::dotenv();
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(limit) = lookup(MAX_LLM_CALLS_ENV).and_then(|v| parse_u64(&v)) {
            self.run.max_llm_calls = limit;
        }
        if let Some(mode) = lookup(STREAMING_ENV).and_then(|v| StreamingMode::from_str(v.trim()).ok()) {
            self.run.streaming_mode = mode;
        }
        if let Some(report) = lookup(REPORT_UNKNOWN_TOOLS_ENV).and_then(|v| parse_bool(&v)) {
            self.run.report_unknown_tools = report;
        }
        if let Some(enabled) = lookup(COMPACTION_ENABLED_ENV).and_then(|v| parse_bool(&v)) {
            self.compaction.enabled = enabled;
        }

        let mut compaction = self.compaction;
        if let Some(interval) = lookup(COMPACTION_INTERVAL_ENV).and_then(|v| parse_positive_usize(&v)) {
            compaction.interval = interval;
        }
        if let Some(overlap) = lookup(COMPACTION_OVERLAP_ENV).and_then(|v| parse_usize(&v)) {
            compaction.overlap = overlap;
        }
        match compaction.validate() {
            Ok(()) => self.compaction = compaction,
            Err(err) => tracing::warn!(error = %err, "ignoring compaction overrides"),
        }
        self
    }

    pub fn validate(&self) -> Result<(), BraidError> {
        self.compaction.validate()
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}

fn parse_positive_usize(value: &str) -> Option<usize> {
    parse_usize(value).filter(|parsed| *parsed > 0)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = BraidConfig::default();
        assert_eq!(config.run.max_llm_calls, 500);
        assert_eq!(config.run.streaming_mode, StreamingMode::None);
        assert!(!config.run.report_unknown_tools);
        assert!(!config.compaction.enabled);
    }

    #[test]
    fn env_overrides_toml() {
        let config = BraidConfig::from_toml_str("[run]\nmax_llm_calls = 7\n")
            .unwrap()
            .with_overrides(overrides(&[
                (MAX_LLM_CALLS_ENV, "9"),
                (STREAMING_ENV, "SSE"),
                (REPORT_UNKNOWN_TOOLS_ENV, "yes"),
                (COMPACTION_ENABLED_ENV, "true"),
            ]));
        assert_eq!(config.run.max_llm_calls, 9);
        assert_eq!(config.run.streaming_mode, StreamingMode::Sse);
        assert!(config.run.report_unknown_tools);
        assert!(config.compaction.enabled);
    }

    #[test]
    fn invalid_env_values_fall_back() {
        let config = BraidConfig::default().with_overrides(overrides(&[
            (MAX_LLM_CALLS_ENV, "lots"),
            (STREAMING_ENV, "websocket"),
            (COMPACTION_INTERVAL_ENV, "0"),
        ]));
        assert_eq!(config, BraidConfig::default());
    }

    #[test]
    fn inconsistent_compaction_overrides_are_rejected_together() {
        let config = BraidConfig::default().with_overrides(overrides(&[
            (COMPACTION_INTERVAL_ENV, "3"),
            (COMPACTION_OVERLAP_ENV, "5"),
        ]));
        assert_eq!(config.compaction, CompactionSettings::default());
    }

    #[test]
    fn toml_validation_errors_surface() {
        let err = BraidConfig::from_toml_str("[compaction]\ninterval = 2\noverlap = 2\n").unwrap_err();
        assert!(matches!(err, BraidError::Configuration(_)));
        let err = BraidConfig::from_toml_str("[run]\nmax_llm_calls = \"many\"\n").unwrap_err();
        assert!(matches!(err, BraidError::Toml(_)));
    }
}
