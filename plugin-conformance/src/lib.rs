//! Reusable conformance harness: spawns a plugin binary and asserts it
//! honors the wire contract, independent of any one host's policy.
//!
//! Every check spawns its own connection rather than reusing one across
//! assertions, since a handshake failure or a violation can leave a
//! connection in a terminal state that later checks shouldn't inherit.

use std::time::Duration;

use plugin_contract::{InvokeToolRequest, RiskClass, RpcMessage, StatusCode, Value, API_VERSION};
use plugin_host::{validate_manifest, HandshakeError, PluginConnection, Track};
use tracing::debug;

/// What binary to exercise and how long to wait for it to come up.
#[derive(Debug, Clone)]
pub struct ConformanceConfig {
    pub binary: String,
    pub args: Vec<String>,
    /// When set, the track-specific checks (risk class ceiling, no
    /// disallowed network hosts, read-only-only tools) run against this
    /// track's default policy.
    pub track: Option<Track>,
    pub call_timeout: Duration,
    pub address_timeout: Duration,
}

impl ConformanceConfig {
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            track: None,
            call_timeout: Duration::from_secs(10),
            address_timeout: Duration::from_secs(5),
        }
    }

    #[must_use]
    pub fn with_track(mut self, track: Track) -> Self {
        self.track = Some(track);
        self
    }
}

/// The outcome of a single named assertion.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// The full outcome of a conformance run: one result per check,
/// in the order the checks executed.
#[derive(Debug, Clone, Default)]
pub struct ConformanceReport {
    pub checks: Vec<CheckResult>,
}

impl ConformanceReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    #[must_use]
    pub fn failures(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }
}

async fn connect(config: &ConformanceConfig) -> Result<PluginConnection, HandshakeError> {
    PluginConnection::spawn("conformance", &config.binary, &config.args, config.call_timeout, config.address_timeout)
        .await
}

fn ok(name: &'static str) -> CheckResult {
    CheckResult { name, passed: true, detail: String::new() }
}

fn fail(name: &'static str, detail: impl Into<String>) -> CheckResult {
    CheckResult { name, passed: false, detail: detail.into() }
}

/// Run every baseline check, then every track-specific check if a track
/// was configured.
pub async fn run(config: &ConformanceConfig) -> ConformanceReport {
    let mut checks = vec![
        check_handshake_accepts_supported_version(config).await,
        check_handshake_rejects_unsupported_version(config).await,
        check_unknown_tool_is_not_found(config).await,
        check_every_declared_tool_is_invocable(config).await,
        check_manifest_is_stable_across_handshakes(config).await,
    ];

    if let Some(track) = config.track {
        checks.push(check_risk_class_within_track_ceiling(config, track).await);
        checks.push(check_no_disallowed_network_hosts(config, track).await);
        checks.push(check_tools_are_read_only_when_track_requires_it(config, track).await);
    }

    ConformanceReport { checks }
}

async fn check_handshake_accepts_supported_version(config: &ConformanceConfig) -> CheckResult {
    const NAME: &str = "handshake_accepts_supported_version";
    let mut connection = match connect(config).await {
        Ok(c) => c,
        Err(e) => return fail(NAME, format!("failed to spawn plugin: {e}")),
    };
    match connection.handshake(API_VERSION).await {
        Ok(manifest) if manifest.name.is_empty() || manifest.version.is_empty() => {
            fail(NAME, "manifest name or version was empty")
        }
        Ok(_) => ok(NAME),
        Err(e) => fail(NAME, format!("handshake failed: {e}")),
    }
}

async fn check_handshake_rejects_unsupported_version(config: &ConformanceConfig) -> CheckResult {
    const NAME: &str = "handshake_rejects_unsupported_version";
    let mut connection = match connect(config).await {
        Ok(c) => c,
        Err(e) => return fail(NAME, format!("failed to spawn plugin: {e}")),
    };
    match connection.handshake("v999-does-not-exist").await {
        Err(HandshakeError::VersionMismatch { .. } | HandshakeError::Transport(_)) => ok(NAME),
        Ok(manifest) => fail(NAME, format!("plugin accepted an unsupported api_version ({})", manifest.api_version)),
        Err(e) => fail(NAME, format!("unexpected handshake error: {e}")),
    }
}

async fn check_unknown_tool_is_not_found(config: &ConformanceConfig) -> CheckResult {
    const NAME: &str = "unknown_tool_is_not_found";
    let mut connection = match connect(config).await {
        Ok(c) => c,
        Err(e) => return fail(NAME, format!("failed to spawn plugin: {e}")),
    };
    if let Err(e) = connection.handshake(API_VERSION).await {
        return fail(NAME, format!("handshake failed: {e}"));
    }
    let request = RpcMessage::InvokeTool(InvokeToolRequest {
        tool_name: "does-not-exist".to_string(),
        input: Value::Null,
        workspace_root: ".".to_string(),
    });
    match connection.call(request).await {
        Ok(RpcMessage::Error(e)) if e.code == StatusCode::NotFound => ok(NAME),
        Ok(other) => fail(NAME, format!("expected a NOT_FOUND error, got {other:?}")),
        Err(e) => fail(NAME, format!("transport error: {e}")),
    }
}

async fn check_every_declared_tool_is_invocable(config: &ConformanceConfig) -> CheckResult {
    const NAME: &str = "every_declared_tool_is_invocable";
    let mut connection = match connect(config).await {
        Ok(c) => c,
        Err(e) => return fail(NAME, format!("failed to spawn plugin: {e}")),
    };
    let manifest = match connection.handshake(API_VERSION).await {
        Ok(m) => m.clone(),
        Err(e) => return fail(NAME, format!("handshake failed: {e}")),
    };

    for tool in manifest.tools() {
        let request = RpcMessage::InvokeTool(InvokeToolRequest {
            tool_name: tool.name.clone(),
            input: Value::map(),
            workspace_root: ".".to_string(),
        });
        match connection.call(request).await {
            Ok(RpcMessage::InvokeToolOk(_)) => {}
            Ok(RpcMessage::Error(e)) => return fail(NAME, format!("tool '{}' returned an error: {e}", tool.name)),
            Ok(other) => return fail(NAME, format!("tool '{}' returned an unexpected message: {other:?}", tool.name)),
            Err(e) => return fail(NAME, format!("tool '{}' transport error: {e}", tool.name)),
        }
    }
    debug!(tools = manifest.tools().count(), "every declared tool was invoked");
    ok(NAME)
}

async fn check_manifest_is_stable_across_handshakes(config: &ConformanceConfig) -> CheckResult {
    const NAME: &str = "manifest_is_stable_across_handshakes";
    let (first, second) = {
        let mut a = match connect(config).await {
            Ok(c) => c,
            Err(e) => return fail(NAME, format!("failed to spawn plugin: {e}")),
        };
        let mut b = match connect(config).await {
            Ok(c) => c,
            Err(e) => return fail(NAME, format!("failed to spawn plugin: {e}")),
        };
        let first = match a.handshake(API_VERSION).await {
            Ok(m) => m.clone(),
            Err(e) => return fail(NAME, format!("first handshake failed: {e}")),
        };
        let second = match b.handshake(API_VERSION).await {
            Ok(m) => m.clone(),
            Err(e) => return fail(NAME, format!("second handshake failed: {e}")),
        };
        (first, second)
    };

    if first.name != second.name || first.version != second.version {
        return fail(NAME, "name/version differed between two handshakes of the same binary");
    }
    if first.capabilities.len() != second.capabilities.len() {
        return fail(NAME, "capability count differed between two handshakes of the same binary");
    }
    ok(NAME)
}

async fn check_risk_class_within_track_ceiling(config: &ConformanceConfig, track: Track) -> CheckResult {
    const NAME: &str = "risk_class_within_track_ceiling";
    let mut connection = match connect(config).await {
        Ok(c) => c,
        Err(e) => return fail(NAME, format!("failed to spawn plugin: {e}")),
    };
    let manifest = match connection.handshake(API_VERSION).await {
        Ok(m) => m.clone(),
        Err(e) => return fail(NAME, format!("handshake failed: {e}")),
    };
    let violations = validate_manifest(&manifest, &track.policy());
    if violations.is_empty() {
        ok(NAME)
    } else {
        fail(NAME, violations.join("; "))
    }
}

async fn check_no_disallowed_network_hosts(config: &ConformanceConfig, track: Track) -> CheckResult {
    const NAME: &str = "no_disallowed_network_hosts";
    let mut connection = match connect(config).await {
        Ok(c) => c,
        Err(e) => return fail(NAME, format!("failed to spawn plugin: {e}")),
    };
    let manifest = match connection.handshake(API_VERSION).await {
        Ok(m) => m.clone(),
        Err(e) => return fail(NAME, format!("handshake failed: {e}")),
    };
    let Some(safety) = manifest.safety.as_ref() else {
        return ok(NAME);
    };
    let policy = track.policy();
    for host in &safety.network_hosts {
        let allowed = policy.allowed_network_hosts.iter().any(|pattern| plugin_host_hosts_match(pattern, host));
        if !allowed {
            return fail(NAME, format!("plugin declared disallowed network host '{host}'"));
        }
    }
    ok(NAME)
}

async fn check_tools_are_read_only_when_track_requires_it(config: &ConformanceConfig, track: Track) -> CheckResult {
    const NAME: &str = "tools_are_read_only_when_track_requires_it";
    if track.policy().max_risk_class != RiskClass::Passive {
        return ok(NAME);
    }
    let mut connection = match connect(config).await {
        Ok(c) => c,
        Err(e) => return fail(NAME, format!("failed to spawn plugin: {e}")),
    };
    let manifest = match connection.handshake(API_VERSION).await {
        Ok(m) => m.clone(),
        Err(e) => return fail(NAME, format!("handshake failed: {e}")),
    };
    let non_read_only: Vec<&str> = manifest.tools().filter(|t| !t.read_only).map(|t| t.name.as_str()).collect();
    if non_read_only.is_empty() {
        ok(NAME)
    } else {
        fail(NAME, format!("track '{}' requires read-only tools but found: {}", track.tag(), non_read_only.join(", ")))
    }
}

fn plugin_host_hosts_match(pattern: &str, requested: &str) -> bool {
    if pattern == requested {
        return true;
    }
    pattern.strip_prefix("*.").is_some_and(|suffix| requested.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_plugin_path() -> String {
        // `reference-plugin` is a dev-dependency built purely for its binary, so
        // Cargo does not populate `CARGO_BIN_EXE_reference-plugin` for it (that
        // variable is only set for binaries of the package under test). Locate
        // the binary Cargo already built next to this crate's own test binary.
        let target_dir = std::env::var("CARGO_TARGET_DIR").map(std::path::PathBuf::from).unwrap_or_else(|_| {
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).parent().expect("workspace root").join("target")
        });
        let profile = if cfg!(debug_assertions) { "debug" } else { "release" };
        target_dir.join(profile).join("reference-plugin").to_string_lossy().into_owned()
    }

    fn reference_plugin_config() -> ConformanceConfig {
        ConformanceConfig::new(reference_plugin_path())
    }

    #[tokio::test]
    async fn reference_plugin_passes_every_baseline_check() {
        let report = run(&reference_plugin_config()).await;
        assert!(report.all_passed(), "failures: {:#?}", report.failures());
    }

    #[tokio::test]
    async fn reference_plugin_satisfies_a_dynamic_runtime_track() {
        let config = reference_plugin_config().with_track(Track::DynamicRuntime);
        let report = run(&config).await;
        assert!(report.all_passed(), "failures: {:#?}", report.failures());
    }

    #[tokio::test]
    async fn reference_plugin_fails_a_passive_track_because_it_declares_a_write_tool() {
        let config = reference_plugin_config().with_track(Track::CoreAnalysis);
        let report = run(&config).await;
        let failure = report
            .checks
            .iter()
            .find(|c| c.name == "tools_are_read_only_when_track_requires_it")
            .expect("the check should have run for a passive-only track");
        assert!(!failure.passed, "write-file is not read-only, the check should have failed");
    }
}
