use serde::{Deserialize, Serialize};

use crate::manifest::Manifest;
use crate::model::{AiComponent, Diagnostic, Finding, Package};
use crate::status::TransportError;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct GetManifestRequest {
    pub api_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct GetManifestResponse {
    pub manifest: Manifest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct InvokeToolRequest {
    pub tool_name: String,
    pub input: Value,
    pub workspace_root: String,
}

/// Response to `InvokeTool`. A tree, not a graph: no cycles.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct InvokeToolResponse {
    pub findings: Vec<Finding>,
    pub packages: Vec<Package>,
    pub ai_components: Vec<AiComponent>,
    pub diagnostics: Vec<Diagnostic>,
}

impl InvokeToolResponse {
    /// Sum of the byte lengths of every user-visible string in the
    /// response. This intentionally ignores fixed-size fields (enums,
    /// integers), matching the under-accounting the bandwidth estimator is
    /// specified to have.
    #[must_use]
    pub fn text_byte_len(&self) -> usize {
        self.findings.iter().map(Finding::text_byte_len).sum::<usize>()
            + self.packages.iter().map(Package::text_byte_len).sum::<usize>()
            + self.ai_components.iter().map(AiComponent::text_byte_len).sum::<usize>()
            + self.diagnostics.iter().map(Diagnostic::text_byte_len).sum::<usize>()
    }
}

/// Exists on the wire for contract symmetry; the host supervisor does not
/// invoke it (see spec's Open Questions).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct StreamArtifactsRequest {
    pub workspace_root: String,
}

/// Envelope framed over the wire. Every call is unary request/response;
/// `Error` carries a `TransportError` for any RPC that failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub enum RpcMessage {
    GetManifest(GetManifestRequest),
    GetManifestOk(GetManifestResponse),
    InvokeTool(InvokeToolRequest),
    InvokeToolOk(InvokeToolResponse),
    StreamArtifacts(StreamArtifactsRequest),
    Error(TransportError),
}
