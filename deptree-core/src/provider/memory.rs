use super::PackageProvider;
use crate::registry::RegistryPackage;
use crate::{DeptreeError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Registry documents held in memory. Handy for fixtures and for callers
/// that already have metadata at hand.
#[derive(Debug, Default, Clone)]
pub struct MemoryProvider {
    packages: HashMap<String, RegistryPackage>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, package: RegistryPackage) {
        self.packages.insert(name.into(), package);
    }

    /// Adds a full registry document; its `name` field is the key.
    pub fn insert_document(&mut self, document: Value) -> Result<()> {
        let package: RegistryPackage =
            serde_json::from_value(document).map_err(|err| DeptreeError::ManifestInvalid {
                package: "<document>".into(),
                reason: err.to_string(),
            })?;

        let name = package
            .name
            .clone()
            .ok_or_else(|| DeptreeError::ManifestInvalid {
                package: "<document>".into(),
                reason: "registry document has no name".into(),
            })?;

        self.insert(name, package);
        Ok(())
    }

    /// Adds one version manifest and points `latest` at it.
    pub fn insert_manifest(&mut self, manifest: Value) -> Result<()> {
        let name = string_field(&manifest, "name")?;
        let version = string_field(&manifest, "version")?;

        let package = self
            .packages
            .entry(name.clone())
            .or_insert_with(|| RegistryPackage {
                name: Some(name),
                ..RegistryPackage::default()
            });

        package
            .dist_tags
            .insert("latest".to_string(), version.clone());
        package.versions.insert(version, manifest);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

fn string_field(manifest: &Value, key: &str) -> Result<String> {
    manifest
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DeptreeError::ManifestInvalid {
            package: "<manifest>".into(),
            reason: format!("missing string field {}", key),
        })
}

#[async_trait]
impl PackageProvider for MemoryProvider {
    async fn get_package_info(&self, name: &str) -> Result<RegistryPackage> {
        self.packages
            .get(name)
            .cloned()
            .ok_or_else(|| DeptreeError::PackageNotFound {
                name: name.to_string(),
            })
    }
}
