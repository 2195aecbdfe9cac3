use serde::Deserialize;

/// One node-group's VM template, extracted from a parsed cluster
/// document (the original's `Spec{name, count, size, keyname}`).
#[derive(Debug, Clone, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    pub count: usize,
    pub size: String,
    #[serde(default)]
    pub keyname: Option<String>,
}

/// The parsed form of a DTRS-returned cluster document.
///
/// The original's `NimbusClusterDocument` wraps an opaque
/// library-specific document object; re-implemented here as an explicit
/// tagged struct (Design Notes: "from dynamic dispatch to tagged
/// variants"). The document text DTRS returns is expected to be JSON
/// shaped like:
///
/// ```json
/// {"needs_contextualization": true, "groups": [{"name": "workers", "count": 2, "size": "small"}]}
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterDocument {
    pub needs_contextualization: bool,
    pub groups: Vec<GroupSpec>,
}

impl ClusterDocument {
    /// Parse a document's text. A parse error is the original's
    /// `CONTEXT_DOC_INVALID` case — callers convert `Err` into that
    /// `ProvisioningError` variant.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Specs keyed by group name, for §4.3.1 validation against the
    /// request's node groups.
    pub fn build_specs(&self) -> &[GroupSpec] {
        &self.groups
    }
}
