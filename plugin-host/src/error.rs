use plugin_contract::TransportError;

/// Errors surfaced while admitting a plugin into the host.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeError),
    #[error("manifest rejected by policy: {}", .0.join("; "))]
    PolicyViolation(Vec<String>),
    #[error("a plugin named '{0}' is already registered")]
    AlreadyRegistered(String),
}

/// Errors surfaced while connecting to and handshaking with a plugin.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("api_version mismatch: host speaks '{host}', plugin declared '{plugin}'")]
    VersionMismatch { host: String, plugin: String },
    #[error("transport error during handshake: {0}")]
    Transport(#[from] TransportError),
    #[error("plugin did not print a PLUGIN_ADDR line within {0:?}")]
    AddressTimeout(std::time::Duration),
    #[error("plugin stdout closed before printing PLUGIN_ADDR")]
    StdoutClosed,
    #[error("malformed PLUGIN_ADDR line: {0}")]
    MalformedAddress(String),
    #[error("failed to spawn plugin process: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("failed to dial plugin at {0}: {1}")]
    Dial(String, std::io::Error),
}

/// Errors surfaced by a single `InvokeTool` call.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("unknown plugin or tool: {0}")]
    NotFound(String),
    #[error("plugin '{0}' is not ready")]
    NotReady(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("rate limit exceeded for plugin '{0}'")]
    RateLimited(String),
    #[error("bandwidth limit exceeded for plugin '{0}'")]
    BandwidthExceeded(String),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors surfaced while closing the host or a plugin connection.
#[derive(Debug, thiserror::Error)]
#[error("{0} plugin(s) failed to close cleanly")]
pub struct CloseError(pub usize);
