//! End-to-end scenarios against the reference plugin binary, covering
//! the numbered cases from the host's behavioral contract: admission,
//! read-only enforcement, fan-out aggregation, and handshake rejection.

use std::time::Duration;

use plugin_contract::{RiskClass, Value, API_VERSION};
use plugin_host::{merge_all_results, AdmissionError, HandshakeError, Host, InvokeError, PluginConnection, Policy};

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

fn default_deadline() -> tokio::time::Instant {
    tokio::time::Instant::now() + Duration::from_secs(30)
}

#[tokio::test]
async fn admitted_plugin_serves_its_read_only_tool() {
    let host = Host::new();
    host.register_process("ref", &reference_plugin_path(), &[], Policy::default(), Duration::from_secs(5))
        .await
        .expect("admission should succeed under the default (passive) policy");

    let response = host
        .invoke_tool("scan", Value::map(), ".", default_deadline())
        .await
        .expect("a read-only tool must be callable under a passive policy");
    assert_eq!(response.findings.len(), 1);
    assert_eq!(response.findings[0].rule_id, "demo.hardcoded-secret");

    host.close().await.expect("plugin should close cleanly");
}

#[tokio::test]
async fn write_tool_is_rejected_under_a_passive_only_policy_and_the_plugin_is_evicted() {
    let host = Host::new();
    host.register_process("ref", &reference_plugin_path(), &[], Policy::default(), Duration::from_secs(5))
        .await
        .expect("admission should succeed under the default (passive) policy");

    let result = host.invoke_tool("write-file", Value::map(), ".", default_deadline()).await;
    assert!(matches!(result, Err(InvokeError::Unauthorized(_))));

    let violations = host.violations().await;
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind.as_str(), "unauthorized_action");

    // The plugin is evicted on a hard violation, so its tools are gone too.
    let scan_after_eviction = host.invoke_tool("scan", Value::map(), ".", default_deadline()).await;
    assert!(matches!(scan_after_eviction, Err(InvokeError::NotFound(_))));
}

#[tokio::test]
async fn write_tool_succeeds_under_a_runtime_policy() {
    let policy = Policy { max_risk_class: RiskClass::Runtime, allowed_file_paths: vec![".".into()], ..Policy::default() };
    let host = Host::new();
    host.register_process("ref", &reference_plugin_path(), &[], policy, Duration::from_secs(5))
        .await
        .expect("admission should succeed");

    let workspace_root = std::env::temp_dir();
    let response = host
        .invoke_tool("write-file", Value::map(), &workspace_root.to_string_lossy(), default_deadline())
        .await
        .expect("a write tool must be callable once the policy allows runtime risk");
    assert!(response.diagnostics.iter().any(|d| d.message.contains("wrote marker")));

    host.close().await.expect("plugin should close cleanly");
}

#[tokio::test]
async fn fan_out_aggregates_findings_from_every_admitted_plugin() {
    let host = Host::new();
    host.register_process("ref-a", &reference_plugin_path(), &[], Policy::default(), Duration::from_secs(5))
        .await
        .expect("first instance should admit");
    host.register_process("ref-b", &reference_plugin_path(), &[], Policy::default(), Duration::from_secs(5))
        .await
        .expect("second instance should admit");

    let responses = host.invoke_all("scan", Value::map(), ".", default_deadline()).await;
    assert_eq!(responses.len(), 2);

    let merged = merge_all_results(responses);
    assert_eq!(merged.findings.len(), 2);
    assert!(merged.findings.iter().all(|f| !f.severity.is_unspecified()));

    host.close().await.expect("plugins should close cleanly");
}

#[tokio::test]
async fn registering_the_same_name_twice_is_rejected() {
    let host = Host::new();
    host.register_process("dup", &reference_plugin_path(), &[], Policy::default(), Duration::from_secs(5))
        .await
        .expect("first registration should succeed");

    let second = host.register_process("dup", &reference_plugin_path(), &[], Policy::default(), Duration::from_secs(5)).await;
    assert!(matches!(second, Err(AdmissionError::AlreadyRegistered(name)) if name == "dup"));

    host.close().await.expect("plugin should close cleanly");
}

#[tokio::test]
async fn handshake_rejects_an_unsupported_api_version() {
    let mut connection =
        PluginConnection::spawn("ref", &reference_plugin_path(), &[], Duration::from_secs(5), Duration::from_secs(5))
            .await
            .expect("spawn should succeed");

    let result = connection.handshake("v0-ancient").await;
    assert!(matches!(result, Err(HandshakeError::VersionMismatch { ref host, .. }) if host == "v0-ancient"));

    connection.close().await;
}

#[tokio::test]
async fn telemetry_tracks_successful_invocations() {
    let host = Host::new();
    host.register_process("ref", &reference_plugin_path(), &[], Policy::default(), Duration::from_secs(5))
        .await
        .expect("admission should succeed");

    host.invoke_tool("scan", Value::map(), ".", default_deadline()).await.expect("scan should succeed");
    host.invoke_tool("scan", Value::map(), ".", default_deadline()).await.expect("scan should succeed");

    let telemetry = host.telemetry_snapshot("ref").await.expect("plugin should still be registered");
    assert_eq!(telemetry.invocations, 2);
    assert_eq!(telemetry.errors, 0);

    host.close().await.expect("plugin should close cleanly");
}

#[tokio::test]
async fn host_speaks_the_workspace_api_version() {
    assert_eq!(API_VERSION, "v1");
}
