use super::PackageProvider;
use crate::console;
use crate::lookup::offset::read_range;
use crate::lookup::{IndexRecord, LineEndings, LookupIndex, corrected_offset, lookup_path};
use crate::registry::{DumpRecord, RegistryPackage};
use crate::{DeptreeError, Result};
use async_trait::async_trait;
use futures::lock::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

/// Serves package metadata straight out of a registry dump through its
/// lookup file. The lookup file is loaded on first use; every read opens
/// its own file handle.
pub struct FlatFileProvider {
    dump: PathBuf,
    lookup: PathBuf,
    line_endings: LineEndings,
    index: OnceCell<LookupIndex>,
    cache: Mutex<HashMap<String, RegistryPackage>>,
}

impl FlatFileProvider {
    pub fn new(dump: impl Into<PathBuf>) -> Self {
        let dump = dump.into();
        let lookup = lookup_path(&dump);

        FlatFileProvider {
            dump,
            lookup,
            line_endings: LineEndings::Raw,
            index: OnceCell::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_line_endings(mut self, line_endings: LineEndings) -> Self {
        self.line_endings = line_endings;
        self
    }

    pub fn dump_path(&self) -> &Path {
        &self.dump
    }

    pub fn lookup_path(&self) -> &Path {
        &self.lookup
    }

    async fn index(&self) -> Result<&LookupIndex> {
        self.index
            .get_or_try_init(|| async {
                let index = LookupIndex::load(&self.lookup)?;
                if console::is_logging_enabled() {
                    console::verbose(&format!(
                        "loaded {} lookup entries from {}",
                        index.len(),
                        self.lookup.display()
                    ));
                }
                Ok(index)
            })
            .await
    }

    fn seek_offset(&self, name: &str, record: &IndexRecord) -> Result<u64> {
        let line = match self.line_endings {
            LineEndings::Raw => 0,
            LineEndings::Normalized => record.line.ok_or_else(|| DeptreeError::CorruptRecord {
                name: name.to_string(),
                path: self.lookup.clone(),
                offset: record.offset,
                length: record.length,
                reason: "normalized offsets need a line column in the lookup file".into(),
            })?,
        };

        Ok(corrected_offset(record.offset, line, self.line_endings))
    }

    fn read_record(&self, name: &str, record: &IndexRecord) -> Result<RegistryPackage> {
        let offset = self.seek_offset(name, record)?;
        let corrupt = |reason: String| DeptreeError::CorruptRecord {
            name: name.to_string(),
            path: self.dump.clone(),
            offset,
            length: record.length,
            reason,
        };

        let mut file = File::open(&self.dump).map_err(|source| DeptreeError::ReadFile {
            path: self.dump.clone(),
            source,
        })?;

        let bytes = read_range(&mut file, offset, record.length)
            .map_err(|err| corrupt(format!("short read: {}", err)))?;

        let parsed: DumpRecord =
            serde_json::from_slice(&bytes).map_err(|err| corrupt(err.to_string()))?;

        Ok(parsed.doc)
    }
}

#[async_trait]
impl PackageProvider for FlatFileProvider {
    async fn get_package_info(&self, name: &str) -> Result<RegistryPackage> {
        if let Some(cached) = self.cache.lock().await.get(name) {
            return Ok(cached.clone());
        }

        let index = self.index().await?;
        let record = index.get(name).ok_or_else(|| DeptreeError::NotInIndex {
            name: name.to_string(),
            path: self.lookup.clone(),
        })?;

        let package = self.read_record(name, record)?;
        self.cache
            .lock()
            .await
            .insert(name.to_string(), package.clone());

        Ok(package)
    }
}
