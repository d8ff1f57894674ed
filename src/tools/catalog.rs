//! Tool Catalog
//!
//! Information Hiding:
//! - Name lookup structure hidden
//! - Declarations checked once at construction and frozen afterwards
//! - Export formats (model tool list, human listing) derived on demand

use super::adapters;
use super::schema::check_declaration;
use super::{FetchAdapter, ToolDeclaration};
use crate::config::{Credentials, Settings};
use crate::error::CatalogError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Bumped whenever a tool is added, removed or its schema changes
pub const CATALOG_VERSION: &str = "2";

struct Entry {
    declaration: ToolDeclaration,
    adapter: Arc<dyn FetchAdapter>,
}

/// Immutable registry of callable operations
///
/// Built once at startup through [`ToolCatalogBuilder`]; there is no way to
/// mutate it afterwards, so lookups and validation are deterministic for the
/// whole process lifetime.
pub struct ToolCatalog {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn builder() -> ToolCatalogBuilder {
        ToolCatalogBuilder::default()
    }

    /// Catalog with every flood and disaster data source
    pub fn with_defaults(
        settings: &Settings,
        credentials: &Credentials,
        alerts: adapters::notification::AlertQueue,
    ) -> Result<Self, CatalogError> {
        let client = reqwest::Client::new();
        let providers = &settings.providers;
        let weather_key = credentials.weather_api_key.clone().unwrap_or_default();

        Self::builder()
            .register(Arc::new(adapters::water_level::WaterLevelAdapter::new(
                client.clone(),
                &providers.water_level,
            )))
            .register(Arc::new(adapters::pump::PumpStatusAdapter::new(
                client.clone(),
                &providers.pumps,
            )))
            .register(Arc::new(adapters::seismic::SeismicAdapter::new(
                client.clone(),
                &providers.seismic,
            )))
            .register(Arc::new(adapters::crowd_report::CrowdReportAdapter::new(
                client.clone(),
                &providers.crowd_reports,
            )))
            .register(Arc::new(adapters::weather::WeatherAdapter::new(
                client.clone(),
                &providers.weather,
                weather_key.clone(),
            )))
            .register(Arc::new(adapters::geocode::GeocodeAdapter::new(
                client,
                &providers.geocode,
                weather_key,
            )))
            .register(Arc::new(adapters::notification::NotificationAdapter::new(
                alerts,
                &providers.notification,
            )))
            .build()
    }

    pub fn version(&self) -> &'static str {
        CATALOG_VERSION
    }

    pub fn lookup(&self, name: &str) -> Option<(&ToolDeclaration, Arc<dyn FetchAdapter>)> {
        self.index.get(name).map(|&i| {
            let entry = &self.entries[i];
            (&entry.declaration, Arc::clone(&entry.adapter))
        })
    }

    /// Tool names in registration order
    pub fn tool_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.declaration.name.as_str()).collect()
    }

    pub fn declarations(&self) -> impl Iterator<Item = &ToolDeclaration> {
        self.entries.iter().map(|e| &e.declaration)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Declarations in the chat-completions `tools` format
    pub fn to_function_tools(&self) -> Vec<Value> {
        self.declarations()
            .map(|declaration| {
                let mut properties = serde_json::Map::new();
                let mut required = Vec::new();
                for param in &declaration.parameters {
                    let mut property = json!({
                        "type": param.param_type,
                        "description": param.description,
                    });
                    if !param.allowed.is_empty() {
                        property["enum"] = json!(param.allowed);
                    }
                    properties.insert(param.name.clone(), property);
                    if param.required {
                        required.push(param.name.clone());
                    }
                }

                json!({
                    "type": "function",
                    "function": {
                        "name": declaration.name,
                        "description": declaration.description,
                        "parameters": {
                            "type": "object",
                            "properties": properties,
                            "required": required,
                        }
                    }
                })
            })
            .collect()
    }

    /// Human-readable listing for the CLI
    pub fn tools_description(&self) -> String {
        let mut descriptions = Vec::new();
        for declaration in self.declarations() {
            let params = if declaration.parameters.is_empty() {
                "  (none)".to_string()
            } else {
                declaration
                    .parameters
                    .iter()
                    .map(|p| {
                        let required = if p.required { "required" } else { "optional" };
                        format!("  - {} ({}): {} [{}]", p.name, p.param_type, p.description, required)
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            };

            descriptions.push(format!(
                "Tool: {}\nDescription: {}\nParameters:\n{}",
                declaration.name, declaration.description, params
            ));
        }
        descriptions.join("\n\n")
    }
}

/// Collects adapters; `build` runs the startup checks
#[derive(Default)]
pub struct ToolCatalogBuilder {
    adapters: Vec<Arc<dyn FetchAdapter>>,
}

impl ToolCatalogBuilder {
    pub fn register(mut self, adapter: Arc<dyn FetchAdapter>) -> Self {
        self.adapters.push(adapter);
        self
    }

    pub fn build(self) -> Result<ToolCatalog, CatalogError> {
        let mut entries = Vec::with_capacity(self.adapters.len());
        let mut index = HashMap::with_capacity(self.adapters.len());

        for adapter in self.adapters {
            let declaration = adapter.declaration();
            check_declaration(&declaration)?;

            if index.contains_key(&declaration.name) {
                return Err(CatalogError::DuplicateTool(declaration.name));
            }

            tracing::info!("Registering tool: {}", declaration.name);
            index.insert(declaration.name.clone(), entries.len());
            entries.push(Entry {
                declaration,
                adapter,
            });
        }

        Ok(ToolCatalog { entries, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;
    use crate::tools::schema::ValidatedArgs;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StaticAdapter {
        declaration: ToolDeclaration,
    }

    #[async_trait]
    impl FetchAdapter for StaticAdapter {
        fn declaration(&self) -> ToolDeclaration {
            self.declaration.clone()
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }

        async fn fetch(&self, _args: ValidatedArgs) -> Result<Value, AdapterError> {
            Ok(json!({}))
        }
    }

    fn adapter(name: &str) -> Arc<dyn FetchAdapter> {
        Arc::new(StaticAdapter {
            declaration: crate::tool_declaration! {
                name: name,
                description: "test adapter",
                parameters: [
                    { name: "region", type: "string", description: "Region name", required: true }
                ]
            },
        })
    }

    #[test]
    fn test_register_and_lookup() {
        let catalog = ToolCatalog::builder()
            .register(adapter("a"))
            .register(adapter("b"))
            .build()
            .unwrap();

        assert!(catalog.lookup("a").is_some());
        assert!(catalog.lookup("b").is_some());
        assert!(catalog.lookup("nonexistent").is_none());
        assert_eq!(catalog.tool_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_names_fail_fast() {
        let result = ToolCatalog::builder()
            .register(adapter("a"))
            .register(adapter("a"))
            .build();
        assert_eq!(result.err(), Some(CatalogError::DuplicateTool("a".to_string())));
    }

    #[test]
    fn test_inconsistent_schema_fails_fast() {
        let mut declaration = adapter("a").declaration();
        declaration.parameters[0].param_type = "str".to_string();
        let result = ToolCatalog::builder()
            .register(Arc::new(StaticAdapter { declaration }))
            .build();
        assert!(matches!(result, Err(CatalogError::InvalidSchema { .. })));
    }

    #[test]
    fn test_function_tools_format() {
        let catalog = ToolCatalog::builder().register(adapter("a")).build().unwrap();
        let tools = catalog.to_function_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["type"], "function");
        assert_eq!(tools[0]["function"]["name"], "a");
        assert_eq!(tools[0]["function"]["parameters"]["required"][0], "region");
        assert_eq!(
            tools[0]["function"]["parameters"]["properties"]["region"]["type"],
            "string"
        );
    }

    #[test]
    fn test_default_catalog() {
        let settings = Settings::default();
        let credentials = Credentials::default();
        let catalog = ToolCatalog::with_defaults(
            &settings,
            &credentials,
            adapters::notification::AlertQueue::new(),
        )
        .unwrap();

        assert_eq!(catalog.len(), 7);
        for name in [
            "get_water_levels",
            "get_pump_status",
            "get_latest_earthquake",
            "get_flood_reports",
            "get_weather",
            "geocode_location",
            "send_notification",
        ] {
            assert!(catalog.lookup(name).is_some(), "missing {}", name);
        }

        let description = catalog.tools_description();
        assert!(description.contains("Description:"));
        assert!(description.contains("Parameters:"));
    }
}
