use crate::manifest::Manifest;
use crate::{DeptreeError, Result};
use deptree_semver::RangeSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// The full registry document of a package: every published version plus
/// dist-tags and publish times.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RegistryPackage {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub versions: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub time: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "dist-tags")]
    pub dist_tags: BTreeMap<String, String>,
}

impl RegistryPackage {
    pub fn is_unpublished(&self) -> bool {
        self.versions.is_empty() && self.time.contains_key("unpublished")
    }

    /// Picks one manifest: `None` follows the `latest` dist-tag, a tag name
    /// follows that tag, anything else is the highest version satisfying the
    /// range.
    pub fn resolve(&self, name: &str, version: Option<&str>) -> Result<Manifest> {
        if self.is_unpublished() {
            return Err(DeptreeError::Unpublished {
                name: name.to_string(),
            });
        }

        let requested = version.map(str::trim).unwrap_or("latest");
        let not_found = || DeptreeError::VersionNotFound {
            name: name.to_string(),
            range: requested.to_string(),
        };

        if let Some(tagged) = self.dist_tags.get(requested) {
            return self
                .versions
                .get(tagged)
                .map(|raw| Manifest::new(raw.clone()))
                .ok_or_else(not_found);
        }

        if let Some(exact) = self.versions.get(requested) {
            return Ok(Manifest::new(exact.clone()));
        }

        let ranges = RangeSet::parse(requested).map_err(|err| DeptreeError::Semver {
            value: format!("{}@{}", name, requested),
            reason: err.to_string(),
        })?;

        let selected = ranges
            .max_satisfying(self.versions.keys().map(String::as_str))
            .ok_or_else(not_found)?;

        self.versions
            .get(selected)
            .map(|raw| Manifest::new(raw.clone()))
            .ok_or_else(not_found)
    }

    /// Publish time of `version`, if the registry recorded one.
    pub fn published_at(&self, version: &str) -> Option<OffsetDateTime> {
        let raw = self.time.get(version)?.as_str()?;
        OffsetDateTime::parse(raw, &Rfc3339).ok()
    }
}

/// One line of a registry dump: `{"id": ..., "key": ..., "doc": {...}}`.
/// Only the document is kept.
#[derive(Debug, Deserialize)]
pub struct DumpRecord {
    pub doc: RegistryPackage,
}

pub(crate) fn encode_package_name(name: &str) -> String {
    if name.starts_with('@') {
        name.replace('/', "%2F")
    } else {
        urlencoding::encode(name).into_owned()
    }
}
