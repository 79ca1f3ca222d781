use std::time::Duration;

use plugin_contract::API_VERSION;
use plugin_host::{validate_manifest, policy_for_tag, PluginConnection};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::{error, info};

use crate::args::validate::ValidateArgs;

#[derive(Tabled)]
struct ViolationRow {
    #[tabled(rename = "#")]
    index: usize,
    violation: String,
}

pub async fn handle(args: ValidateArgs) {
    let binary = args.binary.to_string_lossy().to_string();
    let policy = policy_for_tag(&args.track);

    let mut connection = match PluginConnection::spawn(
        "validate",
        &binary,
        &args.arg,
        Duration::from_secs(30),
        Duration::from_secs(args.address_timeout_secs),
    )
    .await
    {
        Ok(c) => c,
        Err(e) => {
            error!(binary = %binary, error = %e, "failed to spawn plugin for validation");
            return;
        },
    };

    let manifest = match connection.handshake(API_VERSION).await {
        Ok(m) => m.clone(),
        Err(e) => {
            error!(binary = %binary, error = %e, "handshake failed");
            connection.close().await;
            return;
        },
    };

    let violations = validate_manifest(&manifest, &policy);
    connection.close().await;

    if violations.is_empty() {
        info!(plugin = %manifest.name, track = %args.track, "manifest conforms to the track's policy");
        println!("{} v{} conforms to track '{}'", manifest.name, manifest.version, args.track);
        return;
    }

    let rows: Vec<ViolationRow> =
        violations.into_iter().enumerate().map(|(i, violation)| ViolationRow { index: i + 1, violation }).collect();
    let mut table = Table::new(rows);
    table.with(Style::modern());
    println!("{} v{} rejected by track '{}':", manifest.name, manifest.version, args.track);
    println!("{table}");
}
