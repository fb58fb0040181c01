//! Configuration file (spotform.json)
//!
//! ```json
//! {
//!   "provider": { "account": "act-12345" },
//!   "resources": [
//!     { "type": "spotinst_health_check", "name": "web", "attributes": { ... } }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use spotform_core::resource::{Resource, Value};
use spotform_provider_spotinst::ConfigSource;
use spotform_state::LocalBackend;

pub const DEFAULT_CONFIG_FILE: &str = "spotform.json";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub provider: ConfigSource,
    #[serde(default)]
    resources: Vec<ResourceBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResourceBlock {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(content)?;

        let mut seen = HashSet::new();
        for block in &file.resources {
            if block.resource_type.is_empty() || block.name.is_empty() {
                bail!("resource type and name must not be empty");
            }
            if !seen.insert((&block.resource_type, &block.name)) {
                bail!(
                    "resource {}.{} is declared more than once",
                    block.resource_type,
                    block.name
                );
            }
        }
        Ok(file)
    }

    /// Declared resources in file order; null attributes are treated as unset
    pub fn resources(&self) -> Vec<Resource> {
        self.resources
            .iter()
            .map(|block| Resource {
                attributes: block
                    .attributes
                    .iter()
                    .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                    .collect(),
                ..Resource::new(&block.resource_type, &block.name)
            })
            .collect()
    }
}

/// State file kept next to the configuration file
pub fn state_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .unwrap_or(Path::new(""))
        .join(LocalBackend::DEFAULT_STATE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotform_core::resource::ResourceId;

    #[test]
    fn parses_provider_and_resources() {
        let file = ConfigFile::parse(
            r#"{
                "provider": {"account": "act-1", "create_timeout_secs": 120},
                "resources": [
                    {
                        "type": "spotinst_health_check",
                        "name": "web",
                        "attributes": {
                            "resource_id": "sig-1",
                            "proxy_port": 80,
                            "check": [{"protocol": "http", "port": 80}]
                        }
                    }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(file.provider.account.as_deref(), Some("act-1"));
        assert_eq!(file.provider.create_timeout_secs, Some(120));

        let resources = file.resources();
        assert_eq!(resources.len(), 1);
        assert_eq!(
            resources[0].id,
            ResourceId::new("spotinst_health_check", "web")
        );
        assert_eq!(resources[0].attributes["proxy_port"], Value::Int(80));
        assert!(matches!(resources[0].attributes["check"], Value::List(_)));
    }

    #[test]
    fn null_attributes_are_unset() {
        let file = ConfigFile::parse(
            r#"{"resources": [{"type": "spotinst_multai_balancer", "name": "lb",
                "attributes": {"name": "lb", "scheme": null}}]}"#,
        )
        .unwrap();

        let resources = file.resources();
        assert!(!resources[0].attributes.contains_key("scheme"));
        assert_eq!(file.provider, ConfigSource::default());
    }

    #[test]
    fn duplicate_resources_are_rejected() {
        let err = ConfigFile::parse(
            r#"{"resources": [
                {"type": "spotinst_health_check", "name": "web"},
                {"type": "spotinst_health_check", "name": "web"}
            ]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("declared more than once"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ConfigFile::parse(r#"{"providers": {}}"#).is_err());
    }

    #[test]
    fn state_lives_next_to_config() {
        assert_eq!(
            state_path(Path::new("infra/spotform.json")),
            Path::new("infra/spotform.state.json")
        );
        assert_eq!(
            state_path(Path::new("spotform.json")),
            Path::new("spotform.state.json")
        );
    }
}
