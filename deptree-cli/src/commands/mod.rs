use deptree_core::{DeptreeConfig, FlatFileProvider, OnlineProvider, PackageProvider};
use std::path::PathBuf;
use std::sync::Arc;

pub mod index;
pub mod loops;
pub mod tree;

/// A registry dump when one is given, the online registry otherwise.
pub fn open_provider(config: &DeptreeConfig, dump: Option<PathBuf>) -> Arc<dyn PackageProvider> {
    match dump {
        Some(path) => {
            tracing::debug!(dump = %path.display(), "using flat-file provider");
            Arc::new(FlatFileProvider::new(path))
        }
        None => {
            tracing::debug!(registry = %config.registry_url(), "using online provider");
            Arc::new(OnlineProvider::from_config(config))
        }
    }
}
