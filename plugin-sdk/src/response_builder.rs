use std::collections::BTreeMap;

use plugin_contract::{AiComponent, Confidence, Diagnostic, DiagnosticSeverity, Finding, InvokeToolResponse, Location, Package, Severity};

/// Fluent construction of an `InvokeTool` response.
#[derive(Debug, Clone, Default)]
pub struct ResponseBuilder {
    response: InvokeToolResponse,
}

impl ResponseBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn finding(self, rule_id: impl Into<String>, message: impl Into<String>) -> FindingBuilder {
        FindingBuilder::new(self, rule_id, message)
    }

    #[must_use]
    pub fn package(mut self, name: impl Into<String>, version: impl Into<String>, ecosystem: impl Into<String>) -> Self {
        self.response.packages.push(Package { name: name.into(), version: version.into(), ecosystem: ecosystem.into() });
        self
    }

    #[must_use]
    pub fn ai_component(self, name: impl Into<String>, component_type: impl Into<String>) -> AiComponentBuilder {
        AiComponentBuilder::new(self, name, component_type)
    }

    #[must_use]
    pub fn diagnostic(mut self, severity: DiagnosticSeverity, message: impl Into<String>) -> Self {
        self.response.diagnostics.push(Diagnostic { severity, message: message.into(), source: String::new() });
        self
    }

    #[must_use]
    pub fn build(self) -> InvokeToolResponse {
        self.response
    }

    fn push_finding(&mut self, finding: Finding) {
        self.response.findings.push(finding);
    }

    fn push_ai_component(&mut self, component: AiComponent) {
        self.response.ai_components.push(component);
    }
}

/// Fluent construction of a single finding, yielded back to the parent
/// `ResponseBuilder` by `.done()`.
pub struct FindingBuilder {
    parent: ResponseBuilder,
    finding: Finding,
}

impl FindingBuilder {
    fn new(parent: ResponseBuilder, rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            parent,
            finding: Finding {
                id: uuid::Uuid::new_v4().to_string(),
                rule_id: rule_id.into(),
                message: message.into(),
                ..Finding::default()
            },
        }
    }

    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.finding.severity = severity;
        self
    }

    #[must_use]
    pub fn confidence(mut self, confidence: Confidence) -> Self {
        self.finding.confidence = confidence;
        self
    }

    #[must_use]
    pub fn at(mut self, file: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        let mut location = self.finding.location.take().unwrap_or_default();
        location.file = file.into();
        location.start_line = start_line;
        location.end_line = end_line;
        self.finding.location = Some(location);
        self
    }

    #[must_use]
    pub fn columns(mut self, start_col: u32, end_col: u32) -> Self {
        let mut location = self.finding.location.take().unwrap_or_default();
        location.start_col = start_col;
        location.end_col = end_col;
        self.finding.location = Some(location);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.finding.metadata.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.finding.fingerprint = fingerprint.into();
        self
    }

    #[must_use]
    pub fn done(mut self) -> ResponseBuilder {
        self.parent.push_finding(self.finding);
        self.parent
    }
}

/// Fluent construction of a single AI component, yielded back to the
/// parent `ResponseBuilder` by `.done()`.
pub struct AiComponentBuilder {
    parent: ResponseBuilder,
    component: AiComponent,
}

impl AiComponentBuilder {
    fn new(parent: ResponseBuilder, name: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            parent,
            component: AiComponent {
                name: name.into(),
                component_type: component_type.into(),
                path: String::new(),
                details: BTreeMap::new(),
            },
        }
    }

    #[must_use]
    pub fn at_path(mut self, path: impl Into<String>) -> Self {
        self.component.path = path.into();
        self
    }

    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.component.details.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn done(mut self) -> ResponseBuilder {
        self.parent.push_ai_component(self.component);
        self.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fluent_chain_builds_a_finding_with_location_and_metadata() {
        let response = ResponseBuilder::new()
            .finding("rule.unsafe-eval", "avoid eval() on untrusted input")
            .severity(Severity::High)
            .confidence(Confidence::Medium)
            .at("src/main.rs", 10, 12)
            .columns(4, 20)
            .with_metadata("cwe", "CWE-95")
            .with_fingerprint("abc123")
            .done()
            .build();

        assert_eq!(response.findings.len(), 1);
        let finding = &response.findings[0];
        assert_eq!(finding.severity, Severity::High);
        let location = finding.location.as_ref().unwrap();
        assert_eq!(location.file, "src/main.rs");
        assert_eq!(location.start_col, 4);
        assert_eq!(finding.metadata.get("cwe").map(String::as_str), Some("CWE-95"));
    }

    #[test]
    fn ai_component_builder_round_trips_into_response() {
        let response = ResponseBuilder::new()
            .ai_component("chat-completion", "llm-call")
            .at_path("src/agent.rs")
            .with_detail("model", "gpt-4")
            .done()
            .build();
        assert_eq!(response.ai_components.len(), 1);
        assert_eq!(response.ai_components[0].path, "src/agent.rs");
    }
}
