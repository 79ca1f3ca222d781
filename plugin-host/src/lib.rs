//! Supervises untrusted plugin subprocesses.
//!
//! Owns admission (manifest vs. policy), per-plugin rate limiting,
//! response redaction, the plugin connection lifecycle, and the host
//! aggregate root that ties them together behind a single lock.

mod admission;
mod config;
mod connection;
mod error;
mod host;
mod policy;
mod rate_limiter;
mod redactor;
mod telemetry;
mod track;
mod violation;

pub use admission::validate_manifest;
pub use config::{ConfigError, ConfigFile};
pub use connection::{PluginConnection, PluginState};
pub use error::{AdmissionError, CloseError, HandshakeError, InvokeError};
pub use host::{merge_all_results, merge_results, Host, ScanResult};
pub use policy::{Policy, PolicyOverrides, DEFAULT_MAX_ARTIFACT_BYTES};
pub use rate_limiter::{LimiterError, RateLimiter};
pub use redactor::redact;
pub use telemetry::PluginTelemetry;
pub use track::{merge_with_user_policy, policy_for_tag, Track};
pub use violation::{RuntimeViolation, ViolationKind};
