use std::time::Duration;

use plugin_contract::RiskClass;
use serde::{Deserialize, Serialize};

/// Default cap on an artifact a plugin may hand back, when neither the
/// policy nor the plugin specifies one: 10 MiB.
pub const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 10 * 1024 * 1024;

/// The host's admission contract. Built from track defaults and
/// optionally tightened or loosened by a `.config` file (see
/// `config.rs`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub allowed_network_hosts: Vec<String>,
    pub allowed_network_cidrs: Vec<String>,
    pub allowed_file_paths: Vec<String>,
    pub allowed_env_vars: Vec<String>,
    pub max_risk_class: RiskClass,
    pub allow_confirmation_required: bool,
    pub max_artifact_bytes: u64,
    pub max_concurrency: usize,
    pub tool_invocation_timeout: Duration,
    /// 0 = unbounded.
    pub requests_per_minute: u32,
    /// 0 = unbounded.
    pub bandwidth_bytes_per_minute: u64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allowed_network_hosts: Vec::new(),
            allowed_network_cidrs: Vec::new(),
            allowed_file_paths: Vec::new(),
            allowed_env_vars: Vec::new(),
            max_risk_class: RiskClass::Passive,
            allow_confirmation_required: false,
            max_artifact_bytes: DEFAULT_MAX_ARTIFACT_BYTES,
            max_concurrency: 4,
            tool_invocation_timeout: Duration::from_secs(30),
            requests_per_minute: 0,
            bandwidth_bytes_per_minute: 0,
        }
    }
}

impl Policy {
    /// The effective artifact size cap: the policy's own value, or the
    /// default when the policy leaves it at zero.
    #[must_use]
    pub fn effective_max_artifact_bytes(&self) -> u64 {
        if self.max_artifact_bytes == 0 {
            DEFAULT_MAX_ARTIFACT_BYTES
        } else {
            self.max_artifact_bytes
        }
    }

    /// Overlay every non-zero/non-empty field of `user` onto `self`,
    /// letting a `.config` file tighten or loosen a track's defaults.
    /// Boolean fields are overlaid unconditionally since there is no
    /// "unset" boolean sentinel; `user` is expected to start from
    /// `Policy::default()` when only a subset of fields is meant to
    /// override.
    #[must_use]
    pub fn merge_with_user(&self, user: &PolicyOverrides) -> Self {
        let mut merged = self.clone();
        if let Some(v) = &user.allowed_network_hosts {
            merged.allowed_network_hosts = v.clone();
        }
        if let Some(v) = &user.allowed_network_cidrs {
            merged.allowed_network_cidrs = v.clone();
        }
        if let Some(v) = &user.allowed_file_paths {
            merged.allowed_file_paths = v.clone();
        }
        if let Some(v) = &user.allowed_env_vars {
            merged.allowed_env_vars = v.clone();
        }
        if let Some(v) = user.max_risk_class {
            merged.max_risk_class = v;
        }
        if let Some(v) = user.allow_confirmation_required {
            merged.allow_confirmation_required = v;
        }
        if let Some(v) = user.max_artifact_bytes {
            merged.max_artifact_bytes = v;
        }
        if let Some(v) = user.max_concurrency {
            merged.max_concurrency = v;
        }
        if let Some(v) = user.tool_invocation_timeout {
            merged.tool_invocation_timeout = v;
        }
        if let Some(v) = user.requests_per_minute {
            merged.requests_per_minute = v;
        }
        if let Some(v) = user.bandwidth_bytes_per_minute {
            merged.bandwidth_bytes_per_minute = v;
        }
        merged
    }
}

/// A sparse set of policy field overrides, as loaded from a `.config`
/// file: every field is optional so that an omitted key falls back to
/// the track's default rather than to a zero value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyOverrides {
    pub allowed_network_hosts: Option<Vec<String>>,
    pub allowed_network_cidrs: Option<Vec<String>>,
    pub allowed_file_paths: Option<Vec<String>>,
    pub allowed_env_vars: Option<Vec<String>>,
    pub max_risk_class: Option<RiskClass>,
    pub allow_confirmation_required: Option<bool>,
    pub max_artifact_bytes: Option<u64>,
    pub max_concurrency: Option<usize>,
    pub tool_invocation_timeout: Option<Duration>,
    pub requests_per_minute: Option<u32>,
    pub bandwidth_bytes_per_minute: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_artifact_bytes_falls_back_to_default() {
        let mut policy = Policy::default();
        policy.max_artifact_bytes = 0;
        assert_eq!(policy.effective_max_artifact_bytes(), DEFAULT_MAX_ARTIFACT_BYTES);
    }

    #[test]
    fn merge_only_overrides_present_fields() {
        let base = Policy { max_concurrency: 7, ..Policy::default() };
        let overrides = PolicyOverrides {
            max_risk_class: Some(RiskClass::Active),
            ..PolicyOverrides::default()
        };
        let merged = base.merge_with_user(&overrides);
        assert_eq!(merged.max_risk_class, RiskClass::Active);
        assert_eq!(merged.max_concurrency, 7);
    }
}
