use crate::error::{OrchestratorError, OrchestratorResult};
use crate::traits::{ToolDescriptor, ToolProvider};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;

struct Binding {
    provider: Arc<dyn ToolProvider>,
    descriptor: usize,
}

/// Flat tool catalog of one turn plus the name → provider binding table.
///
/// Built fresh from the providers at the start of each turn and dropped when
/// the turn ends.
pub struct ToolCatalog {
    descriptors: Vec<ToolDescriptor>,
    bindings: HashMap<String, Binding>,
}

impl ToolCatalog {
    /// Lists every provider (concurrently) and aggregates the results in
    /// provider order. Fails on the first name advertised twice.
    pub async fn build(providers: &[Arc<dyn ToolProvider>]) -> OrchestratorResult<Self> {
        let listings = join_all(providers.iter().map(|p| p.list_tools())).await;

        let mut descriptors = Vec::new();
        let mut bindings: HashMap<String, Binding> = HashMap::new();

        for (provider, listing) in providers.iter().zip(listings) {
            let tools = listing.map_err(|source| OrchestratorError::ToolListing {
                provider: provider.name().to_string(),
                source,
            })?;

            for descriptor in tools {
                if let Some(existing) = bindings.get(&descriptor.name) {
                    return Err(OrchestratorError::DuplicateTool {
                        name: descriptor.name,
                        first: existing.provider.name().to_string(),
                        second: provider.name().to_string(),
                    });
                }

                bindings.insert(
                    descriptor.name.clone(),
                    Binding {
                        provider: Arc::clone(provider),
                        descriptor: descriptors.len(),
                    },
                );
                descriptors.push(descriptor);
            }
        }

        tracing::debug!(
            tools = descriptors.len(),
            providers = providers.len(),
            "Tool catalog built"
        );

        Ok(Self {
            descriptors,
            bindings,
        })
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub fn resolve(&self, name: &str) -> Option<(&Arc<dyn ToolProvider>, &ToolDescriptor)> {
        self.bindings
            .get(name)
            .map(|b| (&b.provider, &self.descriptors[b.descriptor]))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    struct Fixed {
        name: &'static str,
        tools: Vec<&'static str>,
        broken: bool,
    }

    #[async_trait]
    impl ToolProvider for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
            if self.broken {
                return Err(ToolError::Transport("connection reset".to_string()));
            }
            Ok(self
                .tools
                .iter()
                .map(|t| ToolDescriptor::new(*t, "", json!({ "type": "object" })))
                .collect())
        }

        async fn invoke(&self, tool_name: &str, _args: Value) -> Result<String, ToolError> {
            Ok(format!("{}:{}", self.name, tool_name))
        }
    }

    fn provider(name: &'static str, tools: Vec<&'static str>) -> Arc<dyn ToolProvider> {
        Arc::new(Fixed {
            name,
            tools,
            broken: false,
        })
    }

    #[tokio::test]
    async fn aggregates_in_provider_order() {
        let catalog = ToolCatalog::build(&[
            provider("remote", vec!["GetCurrentTime"]),
            provider("local", vec!["BookMeeting", "Echo"]),
        ])
        .await
        .unwrap();

        let names: Vec<&str> = catalog.descriptors().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["GetCurrentTime", "BookMeeting", "Echo"]);

        let (owner, descriptor) = catalog.resolve("Echo").unwrap();
        assert_eq!(owner.name(), "local");
        assert_eq!(descriptor.name, "Echo");
        assert!(catalog.resolve("Missing").is_none());
    }

    #[tokio::test]
    async fn duplicate_names_fail() {
        let err = ToolCatalog::build(&[
            provider("remote", vec!["GetCurrentTime"]),
            provider("local", vec!["GetCurrentTime"]),
        ])
        .await
        .err()
        .unwrap();

        match err {
            OrchestratorError::DuplicateTool {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "GetCurrentTime");
                assert_eq!(first, "remote");
                assert_eq!(second, "local");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn listing_failure_names_provider() {
        let broken: Arc<dyn ToolProvider> = Arc::new(Fixed {
            name: "remote",
            tools: vec![],
            broken: true,
        });
        let err = ToolCatalog::build(&[broken]).await.err().unwrap();
        assert!(matches!(err, OrchestratorError::ToolListing { ref provider, .. } if provider == "remote"));
    }

    #[tokio::test]
    async fn no_providers_is_empty_catalog() {
        let catalog = ToolCatalog::build(&[]).await.unwrap();
        assert!(catalog.is_empty());
    }
}
