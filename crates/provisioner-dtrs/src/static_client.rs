use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use provisioner_domain::{DtrsGroupFields, NodeGroupSummary};

use crate::client::{DtrsClient, DtrsLookupResult};
use crate::error::DeployableTypeLookupError;

#[derive(Clone)]
struct Entry {
    document: String,
    nodes: HashMap<String, DtrsGroupFields>,
}

/// Fixed in-memory deployable-type table, for tests and the CLI's local
/// demo mode. Register documents with [`StaticDtrsClient::register`]
/// before use; unregistered types fail lookup with
/// [`DeployableTypeLookupError`].
#[derive(Default)]
pub struct StaticDtrsClient {
    entries: RwLock<HashMap<String, Entry>>,
}

impl StaticDtrsClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        deployable_type: impl Into<String>,
        document: impl Into<String>,
        nodes: HashMap<String, DtrsGroupFields>,
    ) {
        let mut guard = self.entries.write().expect("lock poisoned");
        guard.insert(deployable_type.into(), Entry { document: document.into(), nodes });
    }
}

#[async_trait]
impl DtrsClient for StaticDtrsClient {
    async fn lookup(
        &self,
        deployable_type: &str,
        nodes: &HashMap<String, NodeGroupSummary>,
        vars: Option<&HashMap<String, String>>,
    ) -> Result<DtrsLookupResult, DeployableTypeLookupError> {
        let guard = self.entries.read().expect("lock poisoned");
        let entry = guard.get(deployable_type).ok_or_else(|| {
            DeployableTypeLookupError(format!("unknown deployable type: {deployable_type}"))
        })?;

        let mut document = entry.document.clone();
        if let Some(vars) = vars {
            for (key, value) in vars {
                document = document.replace(&format!("{{{{{key}}}}}"), value);
            }
        }

        // every requested group must have a registered node entry
        for group_name in nodes.keys() {
            if !entry.nodes.contains_key(group_name) {
                return Err(DeployableTypeLookupError(format!(
                    "deployable type '{deployable_type}' has no group '{group_name}'"
                )));
            }
        }

        Ok(DtrsLookupResult { document, nodes: entry.nodes.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unregistered_type_fails_lookup() {
        let client = StaticDtrsClient::new();
        let result = client.lookup("missing", &HashMap::new(), None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn registered_type_substitutes_vars() {
        let client = StaticDtrsClient::new();
        client.register("dt", "hello {{name}}", HashMap::new());

        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "world".to_string());

        let result = client.lookup("dt", &HashMap::new(), Some(&vars)).await.unwrap();
        assert_eq!(result.document, "hello world");
    }

    #[tokio::test]
    async fn missing_group_fails_lookup() {
        let client = StaticDtrsClient::new();
        client.register("dt", "doc", HashMap::new());

        let mut nodes = HashMap::new();
        nodes.insert(
            "workers".to_string(),
            NodeGroupSummary { count: 2, site: "site-a".into(), allocation: "small".into() },
        );

        let result = client.lookup("dt", &nodes, None).await;
        assert!(result.is_err());
    }
}
