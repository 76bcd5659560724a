use crate::Result;
use crate::manifest::Manifest;
use crate::registry::RegistryPackage;
use crate::spec::PackageVersion;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};

pub mod flatfile;
pub mod memory;
pub mod online;

pub use flatfile::FlatFileProvider;
pub use memory::MemoryProvider;
pub use online::OnlineProvider;

/// A source of package manifests.
#[async_trait]
pub trait PackageProvider: Send + Sync {
    /// Full registry document for `name`.
    async fn get_package_info(&self, name: &str) -> Result<RegistryPackage>;

    /// One manifest; `version` may be an exact version, a dist-tag or a range.
    async fn get_package_json(&self, name: &str, version: Option<&str>) -> Result<Manifest> {
        self.get_package_info(name).await?.resolve(name, version)
    }

    /// Manifests for `pairs`, yielded in the same order as requested.
    /// Fetches one at a time unless an implementation overrides it.
    fn get_package_jsons<'a>(
        &'a self,
        pairs: Vec<PackageVersion>,
    ) -> BoxStream<'a, Result<Manifest>> {
        stream::iter(pairs)
            .then(move |pair| async move {
                self.get_package_json(&pair.name, pair.version.as_deref())
                    .await
            })
            .boxed()
    }
}
