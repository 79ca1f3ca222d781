use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use plugin_contract::{
    AiComponent, Diagnostic, DiagnosticSeverity, Finding, InvokeToolRequest, InvokeToolResponse, Package, RpcMessage,
    Value,
};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::admission::validate_manifest;
use crate::connection::{PluginConnection, PluginState};
use crate::error::{AdmissionError, CloseError, InvokeError};
use crate::policy::Policy;
use crate::rate_limiter::RateLimiter;
use crate::redactor;
use crate::telemetry::PluginTelemetry;
use crate::violation::{RuntimeViolation, ViolationKind};

/// A registered plugin: its connection, the policy it was admitted
/// under, and its own rate limiter/telemetry. The connection is behind
/// its own mutex so the host lock is never held across an RPC.
struct PluginSlot {
    name: String,
    policy: Policy,
    limiter: RateLimiter,
    connection: Mutex<PluginConnection>,
    telemetry: Mutex<PluginTelemetry>,
}

#[derive(Default)]
struct HostInner {
    plugins: BTreeMap<String, Arc<PluginSlot>>,
    /// `"<plugin>.<tool>"` -> plugin name. Rebuilt on every registration
    /// and removal; resolved with a stable, name-sorted scan rather than
    /// the unordered "first match" the contract leaves unspecified.
    tool_index: BTreeMap<String, String>,
    diagnostics: Vec<Diagnostic>,
    violations: Vec<RuntimeViolation>,
}

/// The aggregate root: owns every plugin connection, the shared tool
/// index, and the accumulated diagnostics/violations logs. All mutation
/// and every exposed read goes through `inner`.
pub struct Host {
    api_version: &'static str,
    inner: Mutex<HostInner>,
}

/// Total, idempotent conversion target for merged tool results: every
/// finding/package/component from every invocation, normalized to the
/// consumer-facing invariants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    pub findings: Vec<Finding>,
    pub packages: Vec<Package>,
    pub ai_components: Vec<AiComponent>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    #[must_use]
    pub fn new() -> Self {
        Self { api_version: plugin_contract::API_VERSION, inner: Mutex::new(HostInner::default()) }
    }

    /// Admit an already-connected plugin channel.
    pub async fn register(&self, name: impl Into<String>, connection: PluginConnection, policy: Policy) -> Result<(), AdmissionError> {
        self.admit(name.into(), connection, policy).await
    }

    /// Spawn `binary` as a subprocess, handshake, and admit it.
    pub async fn register_process(
        &self,
        name: impl Into<String>,
        binary: &str,
        args: &[String],
        policy: Policy,
        address_timeout: Duration,
    ) -> Result<(), AdmissionError> {
        let name = name.into();
        let connection =
            PluginConnection::spawn(name.clone(), binary, args, policy.tool_invocation_timeout, address_timeout)
                .await?;
        self.admit(name, connection, policy).await
    }

    async fn admit(&self, name: String, mut connection: PluginConnection, policy: Policy) -> Result<(), AdmissionError> {
        {
            let inner = self.inner.lock().await;
            if inner.plugins.contains_key(&name) {
                return Err(AdmissionError::AlreadyRegistered(name));
            }
        }

        let manifest = connection.handshake(self.api_version).await?.clone();

        let violations = validate_manifest(&manifest, &policy);
        if !violations.is_empty() {
            connection.close().await;
            return Err(AdmissionError::PolicyViolation(violations));
        }

        let slot = Arc::new(PluginSlot {
            name: name.clone(),
            limiter: RateLimiter::new(policy.requests_per_minute, policy.bandwidth_bytes_per_minute),
            policy,
            connection: Mutex::new(connection),
            telemetry: Mutex::new(PluginTelemetry::default()),
        });

        let mut inner = self.inner.lock().await;
        for tool in manifest.tools() {
            inner.tool_index.insert(format!("{name}.{}", tool.name), name.clone());
        }
        inner.plugins.insert(name.clone(), slot);
        info!(plugin = %name, "plugin admitted");
        Ok(())
    }

    /// Resolve a possibly-unqualified tool name to a `(plugin, read_only)`
    /// pair via a stable, name-sorted scan of the tool index.
    async fn resolve_tool(&self, tool: &str) -> Option<(Arc<PluginSlot>, bool)> {
        let inner = self.inner.lock().await;
        let plugin_name = if let Some(owner) = inner.tool_index.get(tool) {
            owner.clone()
        } else {
            inner
                .tool_index
                .iter()
                .find(|(key, _)| key.ends_with(&format!(".{tool}")))
                .map(|(_, owner)| owner.clone())?
        };
        let slot = inner.plugins.get(&plugin_name)?.clone();
        let short_name = tool.rsplit('.').next().unwrap_or(tool);
        let read_only = slot.read_only_for(short_name);
        Some((slot, read_only))
    }

    /// Run the full single-tool pipeline from spec §4.6 against one
    /// plugin, returning the redacted response.
    pub async fn invoke_tool(
        &self,
        tool: &str,
        input: Value,
        workspace_root: &str,
        deadline: Instant,
    ) -> Result<InvokeToolResponse, InvokeError> {
        let Some((slot, read_only)) = self.resolve_tool(tool).await else {
            return Err(InvokeError::NotFound(tool.to_string()));
        };
        self.invoke_slot(&slot, tool, read_only, input, workspace_root, deadline).await
    }

    async fn invoke_slot(
        &self,
        slot: &Arc<PluginSlot>,
        tool: &str,
        read_only: bool,
        input: Value,
        workspace_root: &str,
        deadline: Instant,
    ) -> Result<InvokeToolResponse, InvokeError> {
        // 1. Read-only gate.
        if slot.policy.max_risk_class == plugin_contract::RiskClass::Passive && !read_only {
            let violation = RuntimeViolation::new(
                ViolationKind::UnauthorizedAction,
                slot.name.clone(),
                format!("tool '{tool}' is not read-only under a passive-only policy"),
            );
            self.handle_violation(violation, &slot.name).await;
            return Err(InvokeError::Unauthorized(tool.to_string()));
        }

        // 2. Request gate.
        if slot.limiter.allow_request(deadline).await.is_err() {
            let violation =
                RuntimeViolation::new(ViolationKind::RateLimitExceeded, slot.name.clone(), "request bucket exhausted");
            self.handle_violation(violation, &slot.name).await;
            return Err(InvokeError::RateLimited(slot.name.clone()));
        }

        // 3. Invoke, timing the call regardless of outcome.
        let request = RpcMessage::InvokeTool(InvokeToolRequest {
            tool_name: tool.rsplit('.').next().unwrap_or(tool).to_string(),
            input,
            workspace_root: workspace_root.to_string(),
        });
        let started = Instant::now();
        let timeout_duration = slot.policy.tool_invocation_timeout;
        let call = async {
            let mut connection = slot.connection.lock().await;
            connection.call(request).await
        };
        let outcome = if timeout_duration.is_zero() {
            call.await
        } else {
            match tokio::time::timeout(timeout_duration, call).await {
                Ok(r) => r,
                Err(_) => Err(plugin_contract::TransportError::deadline_exceeded(format!(
                    "tool '{tool}' exceeded {timeout_duration:?}"
                ))),
            }
        };
        let elapsed = started.elapsed();

        let response = match outcome {
            Ok(RpcMessage::InvokeToolOk(response)) => response,
            Ok(RpcMessage::Error(err)) => {
                self.record_invocation(slot, elapsed, false).await;
                return Err(InvokeError::Transport(err));
            }
            Ok(_other) => {
                self.record_invocation(slot, elapsed, false).await;
                return Err(InvokeError::Transport(plugin_contract::TransportError::internal(
                    "unexpected response to InvokeTool",
                )));
            }
            Err(err) => {
                self.record_invocation(slot, elapsed, false).await;
                return Err(InvokeError::Transport(err));
            }
        };

        // 4. Bandwidth gate.
        let payload_bytes = response.text_byte_len() as u64;
        if slot.limiter.allow_bandwidth(payload_bytes, deadline).await.is_err() {
            self.record_invocation(slot, elapsed, false).await;
            let violation = RuntimeViolation::new(
                ViolationKind::BandwidthExceeded,
                slot.name.clone(),
                format!("response of {payload_bytes} bytes exceeded the bandwidth bucket"),
            );
            self.handle_violation(violation, &slot.name).await;
            return Err(InvokeError::BandwidthExceeded(slot.name.clone()));
        }

        // 5. Redaction (warn-and-continue).
        let (mut response, any_redacted) = redactor::redact(response);
        if any_redacted {
            let violation =
                RuntimeViolation::new(ViolationKind::SecretLeaked, slot.name.clone(), "response contained a redacted secret");
            self.record_soft_violation(slot, violation).await;
            response.diagnostics.push(Diagnostic {
                severity: DiagnosticSeverity::Warning,
                message: format!("plugin '{}' response contained a redacted secret", slot.name),
                source: slot.name.clone(),
            });
        }

        // 6. Diagnostics collection.
        {
            let mut inner = self.inner.lock().await;
            for diagnostic in &response.diagnostics {
                let mut d = diagnostic.clone();
                if d.source.is_empty() {
                    d.source = slot.name.clone();
                }
                inner.diagnostics.push(d);
            }
        }

        // 7. Telemetry.
        self.record_invocation(slot, elapsed, true).await;

        Ok(response)
    }

    /// Fan out to every plugin declaring `tool`, bounded by
    /// `policy.max_concurrency`. Per-plugin failures degrade to
    /// diagnostics rather than failing the whole call.
    pub async fn invoke_all(&self, tool: &str, input: Value, workspace_root: &str, deadline: Instant) -> Vec<InvokeToolResponse> {
        let candidates: Vec<(Arc<PluginSlot>, bool)> = {
            let inner = self.inner.lock().await;
            inner
                .plugins
                .values()
                .filter_map(|slot| {
                    let read_only = slot
                        .connection
                        .try_lock()
                        .ok()?
                        .manifest()
                        .and_then(|m| m.find_tool(tool))
                        .map(|t| t.read_only)?;
                    Some((slot.clone(), read_only))
                })
                .collect()
        };

        let max_concurrency = candidates.first().map_or(1, |(s, _)| s.policy.max_concurrency.max(1));

        let results: Vec<(Arc<PluginSlot>, Result<InvokeToolResponse, InvokeError>)> = stream::iter(candidates)
            .map(|(slot, read_only)| {
                let input = input.clone();
                async move {
                    let result = self.invoke_slot(&slot, tool, read_only, input, workspace_root, deadline).await;
                    (slot, result)
                }
            })
            .buffer_unordered(max_concurrency)
            .collect()
            .await;

        let mut responses = Vec::with_capacity(results.len());
        for (slot, result) in results {
            match result {
                Ok(response) => responses.push(response),
                Err(err) => {
                    let mut inner = self.inner.lock().await;
                    inner.diagnostics.push(Diagnostic {
                        severity: DiagnosticSeverity::Error,
                        message: format!("tool '{tool}' failed on plugin '{}': {err}", slot.name),
                        source: slot.name.clone(),
                    });
                }
            }
        }
        responses
    }

    /// Always: log, append the violation, append a matching error
    /// diagnostic, mark `Failed`, close, remove from the registry,
    /// rebuild the tool index. `secret_leaked` uses
    /// [`Self::record_soft_violation`] instead, which skips termination.
    async fn handle_violation(&self, violation: RuntimeViolation, plugin: &str) {
        warn!(plugin, kind = violation.kind.as_str(), message = %violation.message, "plugin violation");

        let slot = {
            let mut inner = self.inner.lock().await;
            inner.diagnostics.push(Diagnostic {
                severity: DiagnosticSeverity::Error,
                message: violation.message.clone(),
                source: plugin.to_string(),
            });
            inner.violations.push(violation);
            inner.plugins.remove(plugin)
        };

        if let Some(slot) = slot {
            slot.telemetry.lock().await.record_violation();
            slot.connection.lock().await.fail();
            slot.connection.lock().await.close().await;
        }

        let mut inner = self.inner.lock().await;
        inner.tool_index.retain(|_, owner| owner != plugin);
    }

    /// Records and diagnostics-logs a `secret_leaked` violation without
    /// terminating the plugin.
    async fn record_soft_violation(&self, slot: &Arc<PluginSlot>, violation: RuntimeViolation) {
        warn!(plugin = %slot.name, kind = violation.kind.as_str(), message = %violation.message, "plugin soft violation");
        slot.telemetry.lock().await.record_violation();
        let mut inner = self.inner.lock().await;
        inner.violations.push(violation);
    }

    async fn record_invocation(&self, slot: &Arc<PluginSlot>, elapsed: Duration, succeeded: bool) {
        let mut telemetry = slot.telemetry.lock().await;
        telemetry.record_invocation(elapsed, succeeded);
    }

    /// A read-only snapshot of a plugin's telemetry counters.
    pub async fn telemetry_snapshot(&self, plugin: &str) -> Option<PluginTelemetry> {
        let inner = self.inner.lock().await;
        let slot = inner.plugins.get(plugin)?.clone();
        drop(inner);
        Some(*slot.telemetry.lock().await)
    }

    #[must_use]
    pub async fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.lock().await.diagnostics.clone()
    }

    #[must_use]
    pub async fn violations(&self) -> Vec<RuntimeViolation> {
        self.inner.lock().await.violations.clone()
    }

    /// Closes every plugin, accumulating failures, and resets both
    /// indices. Idempotent per plugin.
    pub async fn close(&self) -> Result<(), CloseError> {
        let slots: Vec<Arc<PluginSlot>> = {
            let mut inner = self.inner.lock().await;
            inner.tool_index.clear();
            std::mem::take(&mut inner.plugins).into_iter().map(|(_, slot)| slot).collect()
        };

        let mut failures = 0;
        for slot in slots {
            let mut connection = slot.connection.lock().await;
            if !matches!(connection.state(), PluginState::Stopped | PluginState::Failed) {
                connection.close().await;
            }
            if !matches!(connection.state(), PluginState::Stopped | PluginState::Failed) {
                failures += 1;
            }
        }

        if failures == 0 {
            Ok(())
        } else {
            Err(CloseError(failures))
        }
    }
}

impl PluginSlot {
    fn read_only_for(&self, tool: &str) -> bool {
        // Accessed only after `resolve_tool` has confirmed the slot owns
        // this tool, so a missing manifest view or tool can't happen in
        // practice; default to `false` (the stricter gate) if it somehow
        // does.
        self.connection
            .try_lock()
            .ok()
            .and_then(|c| c.manifest().and_then(|m| m.find_tool(tool).map(|t| t.read_only)))
            .unwrap_or(false)
    }
}

/// Append a wire response's contents into a `ScanResult`, normalizing
/// each finding for delivery. Conversion is total: there is no sub-message
/// that can be nil in this workspace's single wire/domain representation,
/// so this reduces to the finding normalization plus a plain append.
pub fn merge_results(response: InvokeToolResponse, result: &mut ScanResult) {
    result.findings.extend(response.findings.into_iter().map(Finding::normalized_for_delivery));
    result.packages.extend(response.packages);
    result.ai_components.extend(response.ai_components);
    result.diagnostics.extend(response.diagnostics);
}

/// Sequential merge over an ordered list of responses.
#[must_use]
pub fn merge_all_results(responses: Vec<InvokeToolResponse>) -> ScanResult {
    let mut result = ScanResult::default();
    for response in responses {
        merge_results(response, &mut result);
    }
    result
}
