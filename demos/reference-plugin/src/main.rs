//! Reference plugin exercising every corner of the wire contract: a
//! read-only `scan` tool and a mutating `write-file` tool. Used by the
//! conformance harness and the host's own integration tests.

use plugin_contract::{DiagnosticSeverity, Severity, TransportError};
use plugin_sdk::{CapabilityBuilder, ManifestBuilder, PluginServer, ResponseBuilder, ToolRequest};
use tokio_util::sync::CancellationToken;
use tracing::info;

fn manifest() -> plugin_contract::Manifest {
    ManifestBuilder::new("reference-plugin", "0.1.0")
        .capability(
            CapabilityBuilder::new("reference")
                .tool("scan", "Scans the workspace root and reports a single demo finding", true)
                .tool("write-file", "Writes a fixed marker file under the workspace root", false),
        )
        .build()
}

async fn handle_scan(req: ToolRequest) -> Result<plugin_contract::InvokeToolResponse, TransportError> {
    info!(workspace_root = %req.workspace_root, "scan invoked");
    let response = ResponseBuilder::new()
        .finding("demo.hardcoded-secret", "found a demo secret for exercise purposes")
        .severity(Severity::Medium)
        .at("src/lib.rs", 10, 10)
        .with_metadata("rule_family", "demo")
        .done()
        .diagnostic(DiagnosticSeverity::Info, "scan completed without error")
        .build();
    Ok(response)
}

async fn handle_write_file(req: ToolRequest) -> Result<plugin_contract::InvokeToolResponse, TransportError> {
    let path = std::path::Path::new(&req.workspace_root).join(".reference-plugin-marker");
    std::fs::write(&path, b"reference-plugin was here\n")
        .map_err(|e| TransportError::internal(format!("failed to write marker file: {e}")))?;
    let response = ResponseBuilder::new()
        .diagnostic(DiagnosticSeverity::Info, format!("wrote marker to {}", path.display()))
        .build();
    Ok(response)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_ansi(false).with_target(false).without_time().init();

    let server = PluginServer::new(manifest())
        .on_tool("scan", |req| handle_scan(req))
        .on_tool("write-file", |req| handle_write_file(req));

    let shutdown = CancellationToken::new();
    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        ctrl_c_shutdown.cancel();
    });

    if let Err(e) = server.serve(shutdown).await {
        eprintln!("reference-plugin failed: {e}");
        std::process::exit(1);
    }
}
