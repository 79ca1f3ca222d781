use std::path::PathBuf;

use clap::Args;

#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the plugin binary to validate
    #[arg(value_name = "BINARY", required = true)]
    pub(crate) binary: PathBuf,

    /// Extra arguments to pass to the plugin binary
    #[arg(long, value_delimiter = ',')]
    pub(crate) arg: Vec<String>,

    /// Track tag to validate the plugin's manifest against
    #[arg(short, long, default_value = "core-analysis")]
    pub(crate) track: String,

    /// How long to wait for the plugin's handshake before giving up
    #[arg(long, default_value_t = 5)]
    pub(crate) address_timeout_secs: u64,
}
