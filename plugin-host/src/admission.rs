use plugin_contract::{Manifest, SafetyRequirements};

use crate::policy::Policy;

/// Check whether `requested` is covered by `pattern`. An exact string
/// always matches; a `*.suffix` pattern matches when `requested` equals
/// the pattern verbatim or ends in the literal `.suffix` substring (so
/// `*.example.com` matches `deep.sub.example.com` but not the bare
/// `example.com`).
fn host_matches(requested: &str, pattern: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix('*') {
        requested == pattern || requested.ends_with(suffix)
    } else {
        requested == pattern
    }
}

/// Relative-path containment: `candidate` lies inside `root` when the
/// path relative to `root` does not begin with `..`.
fn path_is_contained(candidate: &str, root: &str) -> bool {
    let candidate = std::path::Path::new(candidate);
    let root = std::path::Path::new(root);
    match candidate.strip_prefix(root) {
        Ok(rel) => !rel.starts_with(".."),
        Err(_) => false,
    }
}

/// Validate every declared safety requirement against `policy`, returning
/// **every** offending field rather than failing fast on the first. A
/// missing safety block always passes.
#[must_use]
pub fn validate_manifest(manifest: &Manifest, policy: &Policy) -> Vec<String> {
    let Some(safety) = &manifest.safety else {
        return Vec::new();
    };
    validate_safety(safety, policy)
}

fn validate_safety(safety: &SafetyRequirements, policy: &Policy) -> Vec<String> {
    let mut violations = Vec::new();

    for host in &safety.network_hosts {
        let allowed = policy.allowed_network_hosts.iter().any(|p| host_matches(host, p));
        if !allowed {
            violations.push(format!("network host '{host}' is not allowed by policy"));
        }
    }

    for cidr in &safety.network_cidrs {
        if !policy.allowed_network_cidrs.iter().any(|c| c == cidr) {
            violations.push(format!("network CIDR '{cidr}' is not allowed by policy"));
        }
    }

    for path in &safety.file_paths {
        let contained = policy.allowed_file_paths.iter().any(|root| path_is_contained(path, root));
        if !contained {
            violations.push(format!("file path '{path}' is not contained in any allowed root"));
        }
    }

    for var in &safety.env_vars {
        if !policy.allowed_env_vars.iter().any(|v| v == var) {
            violations.push(format!("env var '{var}' is not allowed by policy"));
        }
    }

    if let Some(declared) = safety.risk_class {
        if declared > policy.max_risk_class {
            violations.push(format!(
                "declared risk class '{declared}' exceeds policy maximum '{}'",
                policy.max_risk_class
            ));
        }
    }

    if safety.needs_confirmation && !policy.allow_confirmation_required {
        violations.push("plugin requires confirmation but policy forbids it".to_string());
    }

    let artifact_limit = policy.effective_max_artifact_bytes();
    if safety.max_artifact_bytes > artifact_limit {
        violations.push(format!(
            "declared max_artifact_bytes {} exceeds policy limit {artifact_limit}",
            safety.max_artifact_bytes
        ));
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugin_contract::RiskClass;

    fn manifest_with(safety: SafetyRequirements) -> Manifest {
        Manifest {
            name: "p".into(),
            version: "1".into(),
            api_version: "v1".into(),
            capabilities: vec![],
            safety: Some(safety),
        }
    }

    #[test]
    fn missing_safety_block_always_passes() {
        let manifest = Manifest { safety: None, ..manifest_with(SafetyRequirements::default()) };
        assert!(validate_manifest(&manifest, &Policy::default()).is_empty());
    }

    #[test]
    fn wildcard_host_matches_subdomains_only() {
        let policy = Policy {
            allowed_network_hosts: vec!["*.example.com".into()],
            ..Policy::default()
        };
        assert!(host_matches("deep.sub.example.com", "*.example.com"));
        assert!(!host_matches("example.com", "*.example.com"));
        assert!(host_matches("*.example.com", "*.example.com"));
        let _ = policy;
    }

    #[test]
    fn path_containment_rejects_dot_dot_escape() {
        assert!(path_is_contained("/work/sub/file.txt", "/work"));
        assert!(!path_is_contained("/work/../etc/passwd", "/work"));
    }

    /// Scenario 1 from spec.md §8: a manifest requesting an unallowed
    /// host, an over-the-max risk class, confirmation when forbidden, an
    /// unallowed env var, and an oversize artifact limit should report
    /// all five violations, not just the first.
    #[test]
    fn scenario_admission_with_violations_reports_all_five() {
        let safety = SafetyRequirements {
            network_hosts: vec!["evil.com".into()],
            risk_class: Some(RiskClass::Runtime),
            max_artifact_bytes: 104_857_600,
            needs_confirmation: true,
            env_vars: vec!["SECRET_KEY".into()],
            ..SafetyRequirements::default()
        };
        let manifest = manifest_with(safety);
        let violations = validate_manifest(&manifest, &Policy::default());
        assert_eq!(violations.len(), 5, "{violations:?}");
    }

    #[test]
    fn validate_manifest_is_pure() {
        let safety = SafetyRequirements { network_hosts: vec!["evil.com".into()], ..SafetyRequirements::default() };
        let manifest = manifest_with(safety);
        let policy = Policy::default();
        let first = validate_manifest(&manifest, &policy);
        let second = validate_manifest(&manifest, &policy);
        assert_eq!(first, second);
    }
}
