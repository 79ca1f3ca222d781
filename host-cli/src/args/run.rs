use std::path::PathBuf;

use clap::Args;

#[derive(Args)]
pub struct RunArgs {
    /// Directory containing plugin binaries to spawn and admit
    #[arg(short, long, default_value = "./plugins/")]
    pub(crate) plugins_dir: PathBuf,

    /// Tool to invoke on every admitted plugin that declares it
    #[arg(short, long, required = true)]
    pub(crate) tool: String,

    /// Track tag every plugin is admitted under
    #[arg(long, default_value = "core-analysis")]
    pub(crate) track: String,

    /// Workspace root passed to every tool invocation
    #[arg(short, long, default_value = ".")]
    pub(crate) workspace_root: String,

    /// Overall deadline for the fan-out, in seconds
    #[arg(long, default_value_t = 60)]
    pub(crate) deadline_secs: u64,
}
