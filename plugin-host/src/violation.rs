use chrono::{DateTime, Utc};

/// A policy or runtime violation the host recorded against a plugin.
/// Hard violations (everything but a secret leak) remove the plugin from
/// the registry and close its channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeViolation {
    pub id: uuid::Uuid,
    pub kind: ViolationKind,
    pub plugin_name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl RuntimeViolation {
    #[must_use]
    pub fn new(kind: ViolationKind, plugin_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            kind,
            plugin_name: plugin_name.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Secret leakage is warn-and-continue; every other kind is hard and
    /// removes the plugin from the registry.
    #[must_use]
    pub fn is_hard(&self) -> bool {
        !matches!(self.kind, ViolationKind::SecretLeaked)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    RateLimitExceeded,
    BandwidthExceeded,
    SecretLeaked,
    UnauthorizedAction,
}

impl ViolationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::BandwidthExceeded => "bandwidth_exceeded",
            Self::SecretLeaked => "secret_leaked",
            Self::UnauthorizedAction => "unauthorized_action",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_leak_is_the_only_soft_violation() {
        let soft = RuntimeViolation::new(ViolationKind::SecretLeaked, "p", "m");
        assert!(!soft.is_hard());
        for kind in [
            ViolationKind::RateLimitExceeded,
            ViolationKind::BandwidthExceeded,
            ViolationKind::UnauthorizedAction,
        ] {
            assert!(RuntimeViolation::new(kind, "p", "m").is_hard());
        }
    }
}
