use std::fs::read_dir;
use std::path::PathBuf;
use std::time::Duration;

use plugin_contract::Value;
use plugin_host::{merge_all_results, policy_for_tag, Host};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::{error, info, warn};

use crate::args::run::RunArgs;

#[derive(Tabled)]
struct FindingRow {
    rule_id: String,
    severity: String,
    file: String,
    message: String,
}

#[derive(Tabled)]
struct DiagnosticRow {
    severity: String,
    source: String,
    message: String,
}

#[derive(Tabled)]
struct ViolationRow {
    plugin: String,
    kind: String,
    message: String,
}

pub async fn handle(args: RunArgs) {
    if !args.plugins_dir.exists() {
        error!(plugins_dir = %args.plugins_dir.display(), "plugins directory does not exist");
        return;
    }

    let binaries = discover_plugin_binaries(&args.plugins_dir);
    if binaries.is_empty() {
        warn!(plugins_dir = %args.plugins_dir.display(), "no plugin binaries found");
        return;
    }

    let policy = policy_for_tag(&args.track);
    let host = Host::new();

    for binary in &binaries {
        let name = binary.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| binary.display().to_string());
        let path = binary.to_string_lossy().to_string();
        match host.register_process(name.clone(), &path, &[], policy.clone(), Duration::from_secs(5)).await {
            Ok(()) => info!(plugin = %name, "admitted"),
            Err(e) => warn!(plugin = %name, error = %e, "failed to admit plugin, skipping"),
        }
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(args.deadline_secs);
    let responses = host.invoke_all(&args.tool, Value::map(), &args.workspace_root, deadline).await;
    let result = merge_all_results(responses);

    if result.findings.is_empty() {
        println!("no findings");
    } else {
        let rows: Vec<FindingRow> = result
            .findings
            .iter()
            .map(|f| FindingRow {
                rule_id: f.rule_id.clone(),
                severity: format!("{:?}", f.severity),
                file: f.location.as_ref().map(|l| l.file.clone()).unwrap_or_default(),
                message: f.message.clone(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::modern());
        println!("{table}");
    }

    if !result.diagnostics.is_empty() {
        let rows: Vec<DiagnosticRow> = result
            .diagnostics
            .iter()
            .map(|d| DiagnosticRow { severity: d.severity.as_log_str().to_string(), source: d.source.clone(), message: d.message.clone() })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::modern());
        println!("diagnostics:");
        println!("{table}");
    }

    let violations = host.violations().await;
    if !violations.is_empty() {
        let rows: Vec<ViolationRow> = violations
            .iter()
            .map(|v| ViolationRow { plugin: v.plugin_name.clone(), kind: v.kind.as_str().to_string(), message: v.message.clone() })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::modern());
        println!("violations:");
        println!("{table}");
    }

    if let Err(e) = host.close().await {
        warn!(error = %e, "some plugins failed to close cleanly");
    }
}

fn discover_plugin_binaries(dir: &PathBuf) -> Vec<PathBuf> {
    let entries = match read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!(dir = %dir.display(), error = %e, "failed to read plugins directory");
            return Vec::new();
        },
    };

    let mut binaries = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && is_executable(&path) {
            binaries.push(path);
        }
    }
    binaries
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    path.extension().is_some_and(|ext| ext == "exe")
}
