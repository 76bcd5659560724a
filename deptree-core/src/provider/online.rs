use super::PackageProvider;
use crate::cache::MetadataCache;
use crate::config::DeptreeConfig;
use crate::console;
use crate::manifest::Manifest;
use crate::registry::{RegistryPackage, encode_package_name};
use crate::spec::PackageVersion;
use crate::{DeptreeError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use futures::lock::Mutex;
use futures::stream::{self, BoxStream};
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::future::Future;
use std::time::Instant;

/// Reads package metadata from an npm-compatible registry over HTTP.
pub struct OnlineProvider {
    client: Client,
    registry: String,
    concurrency: usize,
    cache: Mutex<HashMap<String, RegistryPackage>>,
    disk: Option<MetadataCache>,
}

impl OnlineProvider {
    pub fn new(registry: impl Into<String>) -> Self {
        OnlineProvider {
            client: Client::new(),
            registry: registry.into().trim_end_matches('/').to_string(),
            concurrency: 16,
            cache: Mutex::new(HashMap::new()),
            disk: None,
        }
    }

    pub fn from_config(config: &DeptreeConfig) -> Self {
        OnlineProvider::new(config.registry_url())
            .with_concurrency(config.registry_concurrency)
            .with_metadata_cache(MetadataCache::from_config(config))
    }

    /// Keeps fetched documents on disk and reuses fresh ones across runs.
    pub fn with_metadata_cache(mut self, cache: MetadataCache) -> Self {
        self.disk = Some(cache);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn package_url(&self, name: &str) -> String {
        format!("{}/{}", self.registry, encode_package_name(name))
    }

    async fn fetch(&self, name: &str) -> Result<RegistryPackage> {
        let url = self.package_url(name);
        let started = Instant::now();

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|source| DeptreeError::Http {
                url: url.clone(),
                source,
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(DeptreeError::PackageNotFound {
                name: name.to_string(),
            });
        }

        let package = response
            .error_for_status()
            .map_err(|source| DeptreeError::Http {
                url: url.clone(),
                source,
            })?
            .json::<RegistryPackage>()
            .await
            .map_err(|source| DeptreeError::Http {
                url: url.clone(),
                source,
            })?;

        if console::is_logging_enabled() {
            console::verbose(&format!(
                "fetched metadata for {} in {:.3}s",
                name,
                started.elapsed().as_secs_f64()
            ));
        }

        Ok(package)
    }
}

#[async_trait]
impl PackageProvider for OnlineProvider {
    async fn get_package_info(&self, name: &str) -> Result<RegistryPackage> {
        if let Some(cached) = self.cache.lock().await.get(name) {
            return Ok(cached.clone());
        }

        let package = match self.disk.as_ref().and_then(|disk| disk.load(name)) {
            Some(cached) => cached,
            None => {
                let fetched = self.fetch(name).await?;
                if let Some(disk) = &self.disk {
                    disk.save(name, &fetched);
                }
                fetched
            }
        };

        self.cache
            .lock()
            .await
            .insert(name.to_string(), package.clone());

        Ok(package)
    }

    /// Fetches up to `concurrency` requests at once; results still come back
    /// in request order.
    fn get_package_jsons<'a>(
        &'a self,
        pairs: Vec<PackageVersion>,
    ) -> BoxStream<'a, Result<Manifest>> {
        ordered_batch(pairs, self.concurrency, move |pair| async move {
            self.get_package_json(&pair.name, pair.version.as_deref())
                .await
        })
    }
}

/// Runs up to `concurrency` calls of `fetch` at once and yields their
/// outputs in the order of `items`.
fn ordered_batch<'a, T, O, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    fetch: F,
) -> BoxStream<'a, O>
where
    T: Send + 'a,
    O: Send + 'a,
    F: FnMut(T) -> Fut + Send + 'a,
    Fut: Future<Output = O> + Send + 'a,
{
    stream::iter(items)
        .map(fetch)
        .buffered(concurrency.max(1))
        .boxed()
}
