//! Wire contract for the plugin host runtime.
//!
//! Defines the RPC surface (`GetManifest`, `InvokeTool`), the message
//! shapes plugins and the host exchange, and the length-prefixed bincode
//! framing both sides use to put those messages on the wire.

mod channel;
mod frame;
mod manifest;
mod model;
mod rpc;
mod severity;
mod status;
mod value;

pub use channel::{Channel, ChannelError};
pub use frame::{FrameError, MessageFrame};
pub use manifest::{Capability, Manifest, ResourceDecl, ToolDecl};
pub use model::{AiComponent, Diagnostic, Finding, Location, Package, SafetyRequirements};
pub use rpc::{
    GetManifestRequest, GetManifestResponse, InvokeToolRequest, InvokeToolResponse, RpcMessage,
    StreamArtifactsRequest,
};
pub use severity::{ArtifactType, Confidence, DiagnosticSeverity, RiskClass, Severity};
pub use status::{StatusCode, TransportError};
pub use value::Value;

/// The only API version the host and SDK in this workspace speak.
pub const API_VERSION: &str = "v1";
