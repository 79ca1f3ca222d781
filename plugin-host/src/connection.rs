use std::process::Stdio;
use std::time::Duration;

use plugin_contract::{Channel, GetManifestRequest, Manifest, RpcMessage, TransportError};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::HandshakeError;

/// Where a plugin connection sits in its lifecycle. The host never
/// exposes a non-`Ready` plugin to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Init,
    Ready,
    Stopping,
    Stopped,
    Failed,
}

/// A single plugin's RPC channel and, if the host spawned it, the owned
/// child process.
pub struct PluginConnection {
    pub name: String,
    state: PluginState,
    channel: Channel,
    manifest: Option<Manifest>,
    child: Option<Child>,
}

impl PluginConnection {
    /// Wrap an already-dialed channel (the "existing channel" entry point
    /// from the supervisor's registration API).
    #[must_use]
    pub fn from_channel(name: impl Into<String>, channel: Channel) -> Self {
        Self { name: name.into(), state: PluginState::Init, channel, manifest: None, child: None }
    }

    /// Spawn `binary`, watch its stdout for a `PLUGIN_ADDR=<host:port>`
    /// line within `address_timeout`, then dial that address. Kills the
    /// child and fails if the deadline passes or stdout closes first.
    pub async fn spawn(
        name: impl Into<String>,
        binary: &str,
        args: &[String],
        call_timeout: Duration,
        address_timeout: Duration,
    ) -> Result<Self, HandshakeError> {
        let name = name.into();
        let mut child = Command::new(binary)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let mut lines = BufReader::new(stdout).lines();

        let addr = match timeout(address_timeout, find_address_line(&mut lines)).await {
            Ok(Ok(Some(addr))) => addr,
            Ok(Ok(None)) => {
                let _ = child.kill().await;
                return Err(HandshakeError::StdoutClosed);
            }
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(HandshakeError::MalformedAddress(e.to_string()));
            }
            Err(_) => {
                let _ = child.kill().await;
                return Err(HandshakeError::AddressTimeout(address_timeout));
            }
        };

        let channel = Channel::dial(&addr, call_timeout)
            .await
            .map_err(|e| HandshakeError::Dial(addr, e))?;

        Ok(Self { name, state: PluginState::Init, channel, manifest: None, child: Some(child) })
    }

    #[must_use]
    pub fn state(&self) -> PluginState {
        self.state
    }

    #[must_use]
    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// Call `GetManifest`, reject a mismatched `api_version`, and on
    /// success transition `Init -> Ready` and store the manifest.
    pub async fn handshake(&mut self, host_api_version: &str) -> Result<&Manifest, HandshakeError> {
        let response = self
            .channel
            .request(&RpcMessage::GetManifest(GetManifestRequest { api_version: host_api_version.to_string() }))
            .await
            .map_err(|e| HandshakeError::Transport(TransportError::internal(e.to_string())))?;

        let manifest = match response {
            RpcMessage::GetManifestOk(ok) => ok.manifest,
            RpcMessage::Error(err) => {
                self.state = PluginState::Failed;
                return Err(HandshakeError::Transport(err));
            }
            other => {
                self.state = PluginState::Failed;
                return Err(HandshakeError::Transport(TransportError::internal(format!(
                    "unexpected response to GetManifest: {other:?}"
                ))));
            }
        };

        if manifest.api_version != host_api_version {
            self.state = PluginState::Failed;
            return Err(HandshakeError::VersionMismatch {
                host: host_api_version.to_string(),
                plugin: manifest.api_version,
            });
        }

        info!(plugin = %self.name, version = %manifest.version, "plugin handshake succeeded");
        self.manifest = Some(manifest);
        self.state = PluginState::Ready;
        Ok(self.manifest.as_ref().expect("just set"))
    }

    /// Invoke a tool's RPC. The caller (the host supervisor) is
    /// responsible for resolving the tool name and enforcing policy
    /// before calling this; this only enforces the `Ready` precondition
    /// and forwards the wire message.
    pub async fn call(&mut self, request: RpcMessage) -> Result<RpcMessage, TransportError> {
        if self.state != PluginState::Ready {
            return Err(TransportError::failed_precondition(format!(
                "plugin '{}' is not ready",
                self.name
            )));
        }
        self.channel
            .request(&request)
            .await
            .map_err(|e| TransportError::unavailable(e.to_string()))
    }

    /// Mark the connection `Failed`, to be called by the supervisor on a
    /// hard policy/runtime violation. The channel is not proactively
    /// closed here; the caller closes the connection immediately after.
    pub fn fail(&mut self) {
        self.state = PluginState::Failed;
    }

    /// Idempotent close. For a spawned child: SIGTERM, 5 s grace, then
    /// SIGKILL. Final state is `Failed` if `fail()` was already called,
    /// otherwise `Stopped`.
    pub async fn close(&mut self) {
        if matches!(self.state, PluginState::Stopped | PluginState::Failed if self.child.is_none()) {
            return;
        }
        if self.state != PluginState::Failed {
            self.state = PluginState::Stopping;
        }

        if let Some(mut child) = self.child.take() {
            terminate_gracefully(&mut child, &self.name).await;
        }

        if self.state != PluginState::Failed {
            self.state = PluginState::Stopped;
        }
    }
}

async fn find_address_line(
    lines: &mut tokio::io::Lines<BufReader<tokio::process::ChildStdout>>,
) -> std::io::Result<Option<String>> {
    while let Some(line) = lines.next_line().await? {
        if let Some(addr) = line.strip_prefix("PLUGIN_ADDR=") {
            return Ok(Some(addr.trim().to_string()));
        }
        debug!(%line, "ignoring non-handshake stdout line during plugin startup");
    }
    Ok(None)
}

#[cfg(unix)]
async fn terminate_gracefully(child: &mut Child, name: &str) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
    }

    match timeout(Duration::from_secs(5), child.wait()).await {
        Ok(_) => {}
        Err(_) => {
            warn!(plugin = %name, "plugin did not exit after SIGTERM, killing");
            let _ = child.kill().await;
            let _ = child.wait().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate_gracefully(child: &mut Child, name: &str) {
    let _ = name;
    let _ = timeout(Duration::from_secs(5), child.wait()).await;
    let _ = child.kill().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_fails_on_address_timeout_when_process_prints_nothing() {
        let result = PluginConnection::spawn(
            "sleeper",
            "sleep",
            &["1".to_string()],
            Duration::from_secs(1),
            Duration::from_millis(50),
        )
        .await;
        assert!(matches!(result, Err(HandshakeError::AddressTimeout(_))));
    }

    #[tokio::test]
    async fn spawn_fails_when_binary_is_missing() {
        let result = PluginConnection::spawn(
            "missing",
            "/nonexistent/binary/path",
            &[],
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(HandshakeError::Spawn(_))));
    }
}
