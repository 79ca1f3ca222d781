use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::severity::{Confidence, DiagnosticSeverity, RiskClass, Severity};

/// Source location of a finding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct Location {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
    pub start_col: u32,
    pub end_col: u32,
}

/// Immutable record produced by a plugin.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct Finding {
    pub id: String,
    pub rule_id: String,
    pub severity: Severity,
    pub confidence: Confidence,
    pub location: Option<Location>,
    pub message: String,
    pub fingerprint: String,
    pub metadata: BTreeMap<String, String>,
}

impl Finding {
    /// Apply the delivery defaults required before a finding reaches a
    /// consumer: an unspecified severity becomes `Info`, unspecified
    /// confidence becomes `Low`. Total and idempotent.
    #[must_use]
    pub fn normalized_for_delivery(mut self) -> Self {
        if self.severity.is_unspecified() {
            self.severity = Severity::delivery_default();
        }
        if self.confidence.is_unspecified() {
            self.confidence = Confidence::delivery_default();
        }
        self
    }

    /// Sum of the byte lengths of every user-visible string this finding
    /// carries: message plus metadata values. Matches the host's
    /// bandwidth estimator, which counts only text (see `response.rs`).
    #[must_use]
    pub fn text_byte_len(&self) -> usize {
        self.message.len() + self.metadata.values().map(String::len).sum::<usize>()
    }
}

/// (name, version, ecosystem) triple.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub ecosystem: String,
}

impl Package {
    #[must_use]
    pub fn text_byte_len(&self) -> usize {
        self.name.len() + self.version.len() + self.ecosystem.len()
    }
}

/// A component of an AI/ML system (model, prompt template, embedding
/// store, ...) discovered by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct AiComponent {
    pub name: String,
    pub component_type: String,
    pub path: String,
    pub details: BTreeMap<String, String>,
}

impl AiComponent {
    #[must_use]
    pub fn text_byte_len(&self) -> usize {
        self.name.len()
            + self.component_type.len()
            + self.path.len()
            + self.details.values().map(String::len).sum::<usize>()
    }
}

/// A non-fatal observation, either reported by a plugin or synthesised by
/// the host (e.g. to record a violation).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub source: String,
}

impl Diagnostic {
    #[must_use]
    pub fn text_byte_len(&self) -> usize {
        self.message.len()
    }
}

/// Safety requirements a plugin declares in its manifest.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct SafetyRequirements {
    pub network_hosts: Vec<String>,
    pub network_cidrs: Vec<String>,
    pub file_paths: Vec<String>,
    pub env_vars: Vec<String>,
    pub risk_class: Option<RiskClass>,
    pub needs_confirmation: bool,
    pub max_artifact_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_total_and_idempotent() {
        let raw = Finding {
            rule_id: "rule".into(),
            ..Default::default()
        };
        let once = raw.clone().normalized_for_delivery();
        assert_eq!(once.severity, Severity::Info);
        assert_eq!(once.confidence, Confidence::Low);
        let twice = once.clone().normalized_for_delivery();
        assert_eq!(once, twice);
    }

    #[test]
    fn normalize_leaves_declared_values_alone() {
        let raw = Finding {
            rule_id: "rule".into(),
            severity: Severity::Critical,
            confidence: Confidence::High,
            ..Default::default()
        };
        let normalized = raw.clone().normalized_for_delivery();
        assert_eq!(normalized.severity, Severity::Critical);
        assert_eq!(normalized.confidence, Confidence::High);
    }

    #[test]
    fn finding_round_trips_through_bincode() {
        let mut metadata = BTreeMap::new();
        metadata.insert("k".to_string(), "v".to_string());
        let finding = Finding {
            id: "f1".into(),
            rule_id: "r1".into(),
            severity: Severity::High,
            confidence: Confidence::Medium,
            location: Some(Location {
                file: "a.rs".into(),
                start_line: 1,
                end_line: 2,
                start_col: 0,
                end_col: 5,
            }),
            message: "found it".into(),
            fingerprint: "abc123".into(),
            metadata,
        };
        let encoded = bincode::encode_to_vec(&finding, bincode::config::standard()).unwrap();
        let (decoded, _): (Finding, usize) =
            bincode::decode_from_slice(&encoded, bincode::config::standard()).unwrap();
        assert_eq!(decoded, finding);
    }
}
