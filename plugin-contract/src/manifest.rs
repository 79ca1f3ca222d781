use serde::{Deserialize, Serialize};

use crate::model::SafetyRequirements;

/// A single invocable operation exposed by a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct ToolDecl {
    pub name: String,
    pub description: String,
    pub read_only: bool,
}

/// A resource exposed by a plugin (addressable by URI template).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct ResourceDecl {
    pub uri_template: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// A named group of tools and resources declared in a manifest.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct Capability {
    pub name: String,
    pub tools: Vec<ToolDecl>,
    pub resources: Vec<ResourceDecl>,
}

/// The manifest a plugin returns from `GetManifest`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[derive(bincode::Encode, bincode::Decode)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub api_version: String,
    pub capabilities: Vec<Capability>,
    pub safety: Option<SafetyRequirements>,
}

impl Manifest {
    /// Every declared tool, flattened across capabilities, in declaration
    /// order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDecl> {
        self.capabilities.iter().flat_map(|c| c.tools.iter())
    }

    #[must_use]
    pub fn find_tool(&self, name: &str) -> Option<&ToolDecl> {
        self.tools().find(|t| t.name == name)
    }

    #[must_use]
    pub fn declares_tool(&self, name: &str) -> bool {
        self.find_tool(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        Manifest {
            name: "p".into(),
            version: "1".into(),
            api_version: "v1".into(),
            capabilities: vec![Capability {
                name: "cap".into(),
                tools: vec![
                    ToolDecl { name: "scan".into(), description: String::new(), read_only: true },
                    ToolDecl { name: "write-file".into(), description: String::new(), read_only: false },
                ],
                resources: vec![],
            }],
            safety: None,
        }
    }

    #[test]
    fn tools_flattens_across_capabilities() {
        let m = sample();
        assert_eq!(m.tools().count(), 2);
        assert!(m.declares_tool("scan"));
        assert!(!m.declares_tool("missing"));
    }

    #[test]
    fn find_tool_returns_declaration() {
        let m = sample();
        let tool = m.find_tool("write-file").unwrap();
        assert!(!tool.read_only);
    }
}
