use crate::config::DeptreeConfig;
use crate::console;
use crate::registry::RegistryPackage;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SECONDS_PER_DAY: u64 = 86_400;

/// Registry documents kept on disk between runs, one `index.json` per
/// package under the metadata directory.
#[derive(Debug, Clone)]
pub struct MetadataCache {
    dir: PathBuf,
    max_age_days: u64,
}

impl MetadataCache {
    pub fn new(dir: impl Into<PathBuf>, max_age_days: u64) -> Self {
        MetadataCache {
            dir: dir.into(),
            max_age_days,
        }
    }

    pub fn from_config(config: &DeptreeConfig) -> Self {
        MetadataCache::new(config.metadata_dir(), config.cache_max_age_days)
    }

    pub fn entry_path(&self, name: &str) -> PathBuf {
        self.dir.join(sanitize_package_name(name)).join("index.json")
    }

    /// A cached document younger than the configured age, if there is one.
    pub fn load(&self, name: &str) -> Option<RegistryPackage> {
        let path = self.entry_path(name);

        if !path.exists() {
            return None;
        }

        if !self.is_fresh(&path) {
            if console::is_logging_enabled() {
                console::verbose(&format!(
                    "cached metadata for {} is stale, will refetch",
                    name
                ));
            }
            return None;
        }

        let data = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<RegistryPackage>(&data) {
            Ok(package) => {
                if console::is_logging_enabled() {
                    console::verbose(&format!(
                        "using cached metadata for {} from {}",
                        name,
                        path.display()
                    ));
                }
                Some(package)
            }
            Err(err) => {
                if console::is_logging_enabled() {
                    console::verbose(&format!(
                        "ignoring unreadable metadata cache {}: {}",
                        path.display(),
                        err
                    ));
                }
                None
            }
        }
    }

    /// Best effort: a cache that cannot be written is reported in verbose
    /// mode and otherwise ignored.
    pub fn save(&self, name: &str, package: &RegistryPackage) {
        let path = self.entry_path(name);
        let Some(dir) = path.parent() else {
            return;
        };

        if let Err(err) = fs::create_dir_all(dir) {
            if console::is_logging_enabled() {
                console::verbose(&format!(
                    "failed to create metadata cache dir {}: {}",
                    dir.display(),
                    err
                ));
            }
            return;
        }

        let written = serde_json::to_string(package)
            .map_err(|err| err.to_string())
            .and_then(|json| fs::write(&path, json).map_err(|err| err.to_string()));

        if console::is_logging_enabled() {
            match written {
                Ok(()) => console::verbose(&format!(
                    "saved metadata cache for {} to {}",
                    name,
                    path.display()
                )),
                Err(err) => console::verbose(&format!(
                    "failed to write metadata cache for {}: {}",
                    name, err
                )),
            }
        }
    }

    fn is_fresh(&self, path: &Path) -> bool {
        let max_age = Duration::from_secs(self.max_age_days.saturating_mul(SECONDS_PER_DAY));

        fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|elapsed| elapsed < max_age)
    }
}

fn sanitize_package_name(name: &str) -> String {
    name.replace('/', "__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn package() -> RegistryPackage {
        serde_json::from_value(json!({
            "name": "@scope/pkg",
            "dist-tags": { "latest": "1.0.0" },
            "versions": { "1.0.0": { "name": "@scope/pkg", "version": "1.0.0" } }
        }))
        .unwrap()
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let cache = MetadataCache::new(dir.path(), 1);

        assert!(cache.load("@scope/pkg").is_none());
        cache.save("@scope/pkg", &package());

        assert_eq!(
            cache.entry_path("@scope/pkg"),
            dir.path().join("@scope__pkg").join("index.json")
        );

        let loaded = cache.load("@scope/pkg").unwrap();
        assert_eq!(loaded.dist_tags.get("latest").map(String::as_str), Some("1.0.0"));
        assert!(loaded.versions.contains_key("1.0.0"));
    }

    #[test]
    fn zero_day_cache_is_always_stale() {
        let dir = tempdir().unwrap();
        let cache = MetadataCache::new(dir.path(), 0);

        cache.save("left-pad", &package());
        assert!(cache.entry_path("left-pad").is_file());
        assert!(cache.load("left-pad").is_none());
    }

    #[test]
    fn unreadable_entries_are_misses() {
        let dir = tempdir().unwrap();
        let cache = MetadataCache::new(dir.path(), 1);
        let path = cache.entry_path("broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();

        assert!(cache.load("broken").is_none());
    }
}
