use plugin_contract::{Capability, Manifest, ResourceDecl, SafetyRequirements, ToolDecl, API_VERSION};

/// Fluent construction of a plugin's manifest: `Manifest::new(name,
/// version)` → add capabilities, each with tools/resources → an optional
/// safety bag → `build()`.
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    name: String,
    version: String,
    capabilities: Vec<Capability>,
    safety: Option<SafetyRequirements>,
}

impl ManifestBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self { name: name.into(), version: version.into(), capabilities: Vec::new(), safety: None }
    }

    #[must_use]
    pub fn capability(mut self, capability: CapabilityBuilder) -> Self {
        self.capabilities.push(capability.build());
        self
    }

    #[must_use]
    pub fn safety(mut self, safety: SafetyRequirements) -> Self {
        self.safety = Some(safety);
        self
    }

    #[must_use]
    pub fn build(self) -> Manifest {
        Manifest {
            name: self.name,
            version: self.version,
            api_version: API_VERSION.to_string(),
            capabilities: self.capabilities,
            safety: self.safety,
        }
    }
}

/// Fluent construction of a single capability's tools and resources.
#[derive(Debug, Clone)]
pub struct CapabilityBuilder {
    name: String,
    tools: Vec<ToolDecl>,
    resources: Vec<ResourceDecl>,
}

impl CapabilityBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), tools: Vec::new(), resources: Vec::new() }
    }

    #[must_use]
    pub fn tool(mut self, name: impl Into<String>, description: impl Into<String>, read_only: bool) -> Self {
        self.tools.push(ToolDecl { name: name.into(), description: description.into(), read_only });
        self
    }

    #[must_use]
    pub fn resource(
        mut self,
        uri_template: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        self.resources.push(ResourceDecl {
            uri_template: uri_template.into(),
            name: name.into(),
            description: description.into(),
            mime_type: mime_type.into(),
        });
        self
    }

    fn build(self) -> Capability {
        Capability { name: self.name, tools: self.tools, resources: self.resources }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_flattenable_tools() {
        let manifest = ManifestBuilder::new("demo", "0.1.0")
            .capability(CapabilityBuilder::new("analysis").tool("scan", "scans the workspace", true))
            .build();
        assert_eq!(manifest.api_version, API_VERSION);
        assert!(manifest.declares_tool("scan"));
    }
}
