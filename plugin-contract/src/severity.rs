use serde::{Deserialize, Serialize};

/// Finding severity. Wire-numbered; enum values must not be renumbered
/// without a major `api_version` bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub enum Severity {
    #[default]
    Unspecified = 0,
    Critical = 1,
    High = 2,
    Medium = 3,
    Low = 4,
    Info = 5,
}

impl Severity {
    /// The default severity used when delivering a finding whose declared
    /// severity was unspecified.
    #[must_use]
    pub const fn delivery_default() -> Self {
        Self::Info
    }

    #[must_use]
    pub const fn is_unspecified(self) -> bool {
        matches!(self, Self::Unspecified)
    }
}

impl From<i32> for Severity {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Critical,
            2 => Self::High,
            3 => Self::Medium,
            4 => Self::Low,
            5 => Self::Info,
            _ => Self::Unspecified,
        }
    }
}

impl From<Severity> for i32 {
    fn from(value: Severity) -> Self {
        value as Self
    }
}

/// Confidence of a finding. Wire-numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub enum Confidence {
    #[default]
    Unspecified = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Confidence {
    #[must_use]
    pub const fn delivery_default() -> Self {
        Self::Low
    }

    #[must_use]
    pub const fn is_unspecified(self) -> bool {
        matches!(self, Self::Unspecified)
    }
}

impl From<i32> for Confidence {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::High,
            2 => Self::Medium,
            3 => Self::Low,
            _ => Self::Unspecified,
        }
    }
}

impl From<Confidence> for i32 {
    fn from(value: Confidence) -> Self {
        value as Self
    }
}

/// Severity of a non-fatal diagnostic. Wire-numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub enum DiagnosticSeverity {
    #[default]
    Unspecified = 0,
    Error = 1,
    Warning = 2,
    Info = 3,
}

impl DiagnosticSeverity {
    /// The lowercase name used in the host's durable diagnostic log.
    #[must_use]
    pub const fn as_log_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info | Self::Unspecified => "info",
        }
    }
}

impl From<i32> for DiagnosticSeverity {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Error,
            2 => Self::Warning,
            3 => Self::Info,
            _ => Self::Unspecified,
        }
    }
}

impl From<DiagnosticSeverity> for i32 {
    fn from(value: DiagnosticSeverity) -> Self {
        value as Self
    }
}

/// Artifact kind surfaced by `StreamArtifacts` (not exercised by the host
/// supervisor, but part of the wire contract both sides must agree on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub enum ArtifactType {
    #[default]
    Unspecified = 0,
    Source = 1,
    Config = 2,
    Lockfile = 3,
    Container = 4,
    AiComponent = 5,
    Unknown = 6,
}

impl From<i32> for ArtifactType {
    fn from(value: i32) -> Self {
        match value {
            1 => Self::Source,
            2 => Self::Config,
            3 => Self::Lockfile,
            4 => Self::Container,
            5 => Self::AiComponent,
            6 => Self::Unknown,
            _ => Self::Unspecified,
        }
    }
}

impl From<ArtifactType> for i32 {
    fn from(value: ArtifactType) -> Self {
        value as Self
    }
}

/// Coarse ordering of how invasive a plugin may be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
#[serde(rename_all = "lowercase")]
pub enum RiskClass {
    #[default]
    Passive = 0,
    Active = 1,
    Runtime = 2,
}

impl std::fmt::Display for RiskClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passive => write!(f, "passive"),
            Self::Active => write!(f, "active"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

impl std::str::FromStr for RiskClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passive" => Ok(Self::Passive),
            "active" => Ok(Self::Active),
            "runtime" => Ok(Self::Runtime),
            other => Err(format!("unknown risk class: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_severity_maps_to_unspecified() {
        assert_eq!(Severity::from(99), Severity::Unspecified);
    }

    #[test]
    fn severity_round_trips_through_i32() {
        for s in [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
            Severity::Info,
        ] {
            assert_eq!(Severity::from(i32::from(s)), s);
        }
    }

    #[test]
    fn risk_class_ordinal_order() {
        assert!(RiskClass::Passive < RiskClass::Active);
        assert!(RiskClass::Active < RiskClass::Runtime);
    }

    #[test]
    fn diagnostic_severity_log_strings() {
        assert_eq!(DiagnosticSeverity::Error.as_log_str(), "error");
        assert_eq!(DiagnosticSeverity::Warning.as_log_str(), "warning");
        assert_eq!(DiagnosticSeverity::Unspecified.as_log_str(), "info");
    }
}
