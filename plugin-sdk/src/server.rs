use std::collections::HashMap;
use std::future::Future;
use std::io::Write;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use plugin_contract::{
    Channel, ChannelError, GetManifestResponse, InvokeToolResponse, Manifest, RpcMessage, StatusCode, TransportError,
    Value, API_VERSION,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type HandlerFuture = Pin<Box<dyn Future<Output = Result<InvokeToolResponse, TransportError>> + Send>>;
type Handler = Arc<dyn Fn(ToolRequest) -> HandlerFuture + Send + Sync>;

/// The view a registered handler receives: the unqualified tool name, the
/// dynamic input value, and the workspace root the host invoked it with.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub tool_name: String,
    pub input: Value,
    pub workspace_root: String,
}

impl ToolRequest {
    /// The input decoded as an ordered map, if it is one.
    #[must_use]
    pub fn input_map(&self) -> Option<&[(String, Value)]> {
        self.input.as_map()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.input.get(key)
    }
}

/// Implements the wire service: `GetManifest` and `InvokeTool` dispatch.
/// Authors build one with a manifest, register a handler per declared
/// tool, then call [`PluginServer::serve`].
pub struct PluginServer {
    manifest: Manifest,
    handlers: HashMap<String, Handler>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to bind a TCP listener: {0}")]
    Bind(std::io::Error),
    #[error("failed to write the PLUGIN_ADDR handshake line: {0}")]
    Handshake(std::io::Error),
}

impl PluginServer {
    #[must_use]
    pub fn new(manifest: Manifest) -> Self {
        Self { manifest, handlers: HashMap::new() }
    }

    /// Register a handler for a declared tool. Panics in debug builds via
    /// a warning log (not a hard error) if `name` was not declared in the
    /// manifest's capabilities, since a mismatch here is an authoring bug
    /// the conformance harness will also catch.
    #[must_use]
    pub fn on_tool<F, Fut>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(ToolRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<InvokeToolResponse, TransportError>> + Send + 'static,
    {
        let name = name.into();
        if !self.manifest.declares_tool(&name) {
            warn!(tool = %name, "registering a handler for a tool the manifest does not declare");
        }
        self.handlers.insert(name, Arc::new(move |req| Box::pin(handler(req))));
        self
    }

    /// Bind an ephemeral TCP port, print `PLUGIN_ADDR=<host:port>` to
    /// stdout, and serve until `shutdown` is cancelled or a termination
    /// signal arrives, then attempt a graceful stop within 5 seconds
    /// before forcing it.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), ServeError> {
        self.serve_to(std::io::stdout(), shutdown).await
    }

    pub async fn serve_to(self, mut sink: impl Write, shutdown: CancellationToken) -> Result<(), ServeError> {
        let listener = TcpListener::bind("127.0.0.1:0").await.map_err(ServeError::Bind)?;
        let addr = listener.local_addr().map_err(ServeError::Bind)?;
        writeln!(sink, "PLUGIN_ADDR={addr}").map_err(ServeError::Handshake)?;
        sink.flush().map_err(ServeError::Handshake)?;
        info!(%addr, "plugin server listening");

        let this = Arc::new(self);
        let accept_shutdown = shutdown.clone();
        let mut connections: JoinSet<()> = JoinSet::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, _) = match accepted {
                        Ok(v) => v,
                        Err(e) => {
                            warn!(error = %e, "failed to accept plugin connection");
                            continue;
                        }
                    };
                    let this = this.clone();
                    let conn_shutdown = accept_shutdown.clone();
                    connections.spawn(async move {
                        if let Err(e) = this.serve_connection(stream, conn_shutdown).await {
                            debug!(error = %e, "plugin connection ended");
                        }
                    });
                }
                () = shutdown.cancelled() => {
                    info!("shutdown requested, draining connections");
                    break;
                }
            }
        }

        let drain = async {
            while connections.join_next().await.is_some() {}
        };
        if tokio::time::timeout(Duration::from_secs(5), drain).await.is_err() {
            warn!(remaining = connections.len(), "connections did not drain within the grace period, aborting");
            connections.abort_all();
            while connections.join_next().await.is_some() {}
        }
        Ok(())
    }

    async fn serve_connection(&self, stream: TcpStream, shutdown: CancellationToken) -> Result<(), ChannelError> {
        stream.set_nodelay(true).ok();
        let mut channel = Channel::from_stream(stream);
        loop {
            tokio::select! {
                message = channel.recv() => {
                    let message = match message {
                        Ok(m) => m,
                        Err(_) => return Ok(()),
                    };
                    let response = self.dispatch(message).await;
                    if channel.send(&response).await.is_err() {
                        return Ok(());
                    }
                }
                () = shutdown.cancelled() => return Ok(()),
            }
        }
    }

    async fn dispatch(&self, message: RpcMessage) -> RpcMessage {
        match message {
            RpcMessage::GetManifest(req) => {
                if req.api_version != API_VERSION {
                    RpcMessage::Error(TransportError::new(
                        StatusCode::FailedPrecondition,
                        format!("unsupported api_version '{}', host speaks '{API_VERSION}'", req.api_version),
                    ))
                } else {
                    RpcMessage::GetManifestOk(GetManifestResponse { manifest: self.manifest.clone() })
                }
            }
            RpcMessage::InvokeTool(req) => {
                let Some(handler) = self.handlers.get(&req.tool_name) else {
                    return RpcMessage::Error(TransportError::not_found(format!("unknown tool '{}'", req.tool_name)));
                };
                let tool_request =
                    ToolRequest { tool_name: req.tool_name, input: req.input, workspace_root: req.workspace_root };
                match handler(tool_request).await {
                    Ok(response) => RpcMessage::InvokeToolOk(response),
                    Err(err) => RpcMessage::Error(err),
                }
            }
            other => RpcMessage::Error(TransportError::internal(format!("unsupported request: {other:?}"))),
        }
    }
}

impl std::fmt::Debug for PluginServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginServer")
            .field("manifest", &self.manifest.name)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugin_contract::{GetManifestRequest, InvokeToolRequest};

    fn demo_manifest() -> Manifest {
        Manifest {
            name: "demo".into(),
            version: "0.1.0".into(),
            api_version: API_VERSION.to_string(),
            capabilities: vec![],
            safety: None,
        }
    }

    #[tokio::test]
    async fn unsupported_api_version_is_rejected() {
        let server = PluginServer::new(demo_manifest());
        let response = server
            .dispatch(RpcMessage::GetManifest(GetManifestRequest { api_version: "v9".into() }))
            .await;
        match response {
            RpcMessage::Error(e) => assert_eq!(e.code, StatusCode::FailedPrecondition),
            other => panic!("expected an error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let server = PluginServer::new(demo_manifest());
        let response = server
            .dispatch(RpcMessage::InvokeTool(InvokeToolRequest {
                tool_name: "missing".into(),
                input: Value::Null,
                workspace_root: ".".into(),
            }))
            .await;
        match response {
            RpcMessage::Error(e) => assert_eq!(e.code, StatusCode::NotFound),
            other => panic!("expected an error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn registered_handler_is_invoked() {
        let server = PluginServer::new(demo_manifest()).on_tool("scan", |_req| async {
            Ok(InvokeToolResponse::default())
        });
        let response = server
            .dispatch(RpcMessage::InvokeTool(InvokeToolRequest {
                tool_name: "scan".into(),
                input: Value::Null,
                workspace_root: ".".into(),
            }))
            .await;
        assert!(matches!(response, RpcMessage::InvokeToolOk(_)));
    }
}
