use std::time::Duration;

use plugin_contract::RiskClass;

use crate::policy::{Policy, PolicyOverrides};

/// The closed set of track tags a plugin can be admitted under. Unknown
/// tags fall back to [`Track::policy`]'s default arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Track {
    CoreAnalysis,
    DynamicRuntime,
    AiSecurity,
    ThreatModeling,
    SupplyChain,
    Intelligence,
    PolicyGovernance,
    IncidentReadiness,
    DeveloperExperience,
    AgentAssistance,
}

impl Track {
    /// Parse a track tag, returning `None` for anything outside the
    /// closed set rather than guessing at a default here; callers decide
    /// how to handle an unknown tag (see [`policy_for_tag`]).
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        Some(match tag {
            "core-analysis" => Self::CoreAnalysis,
            "dynamic-runtime" => Self::DynamicRuntime,
            "ai-security" => Self::AiSecurity,
            "threat-modeling" => Self::ThreatModeling,
            "supply-chain" => Self::SupplyChain,
            "intelligence" => Self::Intelligence,
            "policy-governance" => Self::PolicyGovernance,
            "incident-readiness" => Self::IncidentReadiness,
            "developer-experience" => Self::DeveloperExperience,
            "agent-assistance" => Self::AgentAssistance,
            _ => return None,
        })
    }

    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::CoreAnalysis => "core-analysis",
            Self::DynamicRuntime => "dynamic-runtime",
            Self::AiSecurity => "ai-security",
            Self::ThreatModeling => "threat-modeling",
            Self::SupplyChain => "supply-chain",
            Self::Intelligence => "intelligence",
            Self::PolicyGovernance => "policy-governance",
            Self::IncidentReadiness => "incident-readiness",
            Self::DeveloperExperience => "developer-experience",
            Self::AgentAssistance => "agent-assistance",
        }
    }

    /// The prebuilt policy for this track: passive, read-only-leaning
    /// tracks stay at `RiskClass::Passive` with no network/file grants;
    /// tracks whose job is to actually run or fetch things are opened up
    /// accordingly.
    #[must_use]
    pub fn policy(self) -> Policy {
        let base = Policy::default();
        match self {
            Self::CoreAnalysis => Policy { max_risk_class: RiskClass::Passive, ..base },
            Self::DynamicRuntime => Policy {
                max_risk_class: RiskClass::Runtime,
                allow_confirmation_required: true,
                allowed_file_paths: vec![".".into()],
                max_concurrency: 2,
                tool_invocation_timeout: Duration::from_secs(120),
                ..base
            },
            Self::AiSecurity => Policy {
                max_risk_class: RiskClass::Active,
                allowed_network_hosts: vec![
                    "*.openai.com".into(),
                    "*.anthropic.com".into(),
                    "*.huggingface.co".into(),
                ],
                ..base
            },
            Self::ThreatModeling => Policy { max_risk_class: RiskClass::Passive, ..base },
            Self::SupplyChain => Policy {
                max_risk_class: RiskClass::Active,
                allowed_network_hosts: vec![
                    "*.npmjs.org".into(),
                    "*.crates.io".into(),
                    "*.pypi.org".into(),
                    "*.github.com".into(),
                ],
                ..base
            },
            Self::Intelligence => Policy {
                max_risk_class: RiskClass::Active,
                allowed_network_cidrs: vec!["0.0.0.0/0".into()],
                ..base
            },
            Self::PolicyGovernance => Policy { max_risk_class: RiskClass::Passive, ..base },
            Self::IncidentReadiness => Policy {
                max_risk_class: RiskClass::Active,
                allow_confirmation_required: true,
                ..base
            },
            Self::DeveloperExperience => Policy {
                max_risk_class: RiskClass::Passive,
                allowed_file_paths: vec![".".into()],
                ..base
            },
            Self::AgentAssistance => Policy {
                max_risk_class: RiskClass::Runtime,
                allow_confirmation_required: true,
                allowed_file_paths: vec![".".into()],
                allowed_env_vars: vec!["PATH".into()],
                ..base
            },
        }
    }
}

/// Resolve a track tag to a policy, falling back to `Policy::default()`
/// for anything outside the closed set of track tags.
#[must_use]
pub fn policy_for_tag(tag: &str) -> Policy {
    Track::parse(tag).map_or_else(Policy::default, Track::policy)
}

/// Overlay any user override onto a track's prebuilt policy.
#[must_use]
pub fn merge_with_user_policy(track: Track, user: &PolicyOverrides) -> Policy {
    track.policy().merge_with_user(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_track_tag_falls_back_to_default_policy() {
        assert_eq!(policy_for_tag("not-a-real-track"), Policy::default());
    }

    #[test]
    fn all_ten_track_tags_parse() {
        let tags = [
            "core-analysis",
            "dynamic-runtime",
            "ai-security",
            "threat-modeling",
            "supply-chain",
            "intelligence",
            "policy-governance",
            "incident-readiness",
            "developer-experience",
            "agent-assistance",
        ];
        for tag in tags {
            let track = Track::parse(tag).unwrap_or_else(|| panic!("{tag} should parse"));
            assert_eq!(track.tag(), tag);
        }
    }

    #[test]
    fn dynamic_runtime_allows_up_to_runtime_risk() {
        assert_eq!(Track::DynamicRuntime.policy().max_risk_class, RiskClass::Runtime);
    }

    #[test]
    fn merge_with_user_policy_overlays_onto_track_default() {
        let overrides = PolicyOverrides { max_concurrency: Some(99), ..PolicyOverrides::default() };
        let merged = merge_with_user_policy(Track::CoreAnalysis, &overrides);
        assert_eq!(merged.max_concurrency, 99);
        assert_eq!(merged.max_risk_class, RiskClass::Passive);
    }
}
