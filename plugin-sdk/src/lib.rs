//! SDK for authoring plugins that conform to the host's wire contract.
//!
//! Exposes fluent manifest and response construction, a handler-map
//! server that performs the stdout address handshake, and the
//! `ToolRequest` view passed to each registered handler.

mod manifest_builder;
mod response_builder;
mod server;

pub use manifest_builder::{CapabilityBuilder, ManifestBuilder};
pub use response_builder::{AiComponentBuilder, FindingBuilder, ResponseBuilder};
pub use server::{PluginServer, ServeError, ToolRequest};
