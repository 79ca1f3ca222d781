use std::time::Duration;

use plugin_contract::RiskClass;
use serde::{Deserialize, Serialize};

use crate::policy::PolicyOverrides;

/// On-disk shape of the policy subset a `.config` file may override. Units
/// are operator-friendly (megabytes, seconds) and converted to the
/// `Policy`'s byte/`Duration` fields on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub allowed_network_hosts: Option<Vec<String>>,
    #[serde(default)]
    pub allowed_network_cidrs: Option<Vec<String>>,
    #[serde(default)]
    pub allowed_file_paths: Option<Vec<String>>,
    #[serde(default)]
    pub allowed_env_vars: Option<Vec<String>>,
    #[serde(default)]
    pub max_risk_class: Option<RiskClass>,
    #[serde(default)]
    pub allow_confirmation_required: Option<bool>,
    #[serde(default)]
    pub max_artifact_megabytes: Option<u64>,
    #[serde(default)]
    pub max_concurrency: Option<usize>,
    #[serde(default)]
    pub tool_invocation_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub requests_per_minute: Option<u32>,
    #[serde(default)]
    pub bandwidth_megabytes_per_minute: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, source: Box<toml::de::Error> },
}

impl ConfigFile {
    /// Load and parse a `.config` file from `path`.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.display().to_string(), source: Box::new(source) })
    }

    /// Convert the operator-friendly on-disk units (MB, seconds) into the
    /// policy's native units (bytes, `Duration`).
    #[must_use]
    pub fn into_overrides(self) -> PolicyOverrides {
        PolicyOverrides {
            allowed_network_hosts: self.allowed_network_hosts,
            allowed_network_cidrs: self.allowed_network_cidrs,
            allowed_file_paths: self.allowed_file_paths,
            allowed_env_vars: self.allowed_env_vars,
            max_risk_class: self.max_risk_class,
            allow_confirmation_required: self.allow_confirmation_required,
            max_artifact_bytes: self.max_artifact_megabytes.map(|mb| mb * 1_048_576),
            max_concurrency: self.max_concurrency,
            tool_invocation_timeout: self.tool_invocation_timeout_seconds.map(Duration::from_secs),
            requests_per_minute: self.requests_per_minute,
            bandwidth_bytes_per_minute: self.bandwidth_megabytes_per_minute.map(|mb| mb * 1_048_576),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn megabyte_and_second_fields_convert_to_native_units() {
        let config = ConfigFile {
            max_artifact_megabytes: Some(5),
            tool_invocation_timeout_seconds: Some(45),
            bandwidth_megabytes_per_minute: Some(2),
            ..ConfigFile::default()
        };
        let overrides = config.into_overrides();
        assert_eq!(overrides.max_artifact_bytes, Some(5 * 1_048_576));
        assert_eq!(overrides.tool_invocation_timeout, Some(Duration::from_secs(45)));
        assert_eq!(overrides.bandwidth_bytes_per_minute, Some(2 * 1_048_576));
    }

    #[test]
    fn parses_toml_document() {
        let toml_text = r#"
            max_risk_class = "active"
            requests_per_minute = 30
        "#;
        let config: ConfigFile = toml::from_str(toml_text).unwrap();
        assert_eq!(config.max_risk_class, Some(RiskClass::Active));
        assert_eq!(config.requests_per_minute, Some(30));
    }
}
