use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeptreeError {
    #[error("Failed to read file {path:?}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },

    #[error("Failed to write file {path:?}: {source}")]
    WriteFile { path: PathBuf, source: std::io::Error },

    #[error("HTTP request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Invalid package spec {input:?}: {reason}")]
    InvalidPackageSpec { input: String, reason: String },

    #[error("Invalid semver range {value}: {reason}")]
    Semver { value: String, reason: String },

    #[error("Invalid manifest for {package}: {reason}")]
    ManifestInvalid { package: String, reason: String },

    #[error("Invalid {field} in {package}: {reason}")]
    InvalidDependencies {
        package: String,
        field: String,
        reason: String,
    },

    #[error("Package {name} not found")]
    PackageNotFound { name: String },

    #[error("No version of {name} satisfies {range}")]
    VersionNotFound { name: String, range: String },

    #[error("Package {name} has been unpublished")]
    Unpublished { name: String },

    #[error("Failed to resolve dependencies of {package}: {source}")]
    Traversal {
        package: String,
        #[source]
        source: Box<DeptreeError>,
    },

    #[error("Attachment {key} failed for {package}: {reason}")]
    AttachmentFailed {
        package: String,
        key: String,
        reason: String,
    },

    #[error("No attachment data {key} on {package}")]
    AttachmentMissing { package: String, key: String },

    #[error("Attachment data {key} on {package} is not a {expected}")]
    AttachmentType {
        package: String,
        key: String,
        expected: &'static str,
    },

    #[error("Lookup file {path:?} not found, build it with `deptree index build`")]
    IndexMissing { path: PathBuf },

    #[error("Lookup file {path:?} already exists, delete it to rebuild")]
    IndexExists { path: PathBuf },

    #[error("Lookup file {path:?} is corrupt at line {line}: {reason}")]
    IndexCorrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Lookup verification failed for {expected} in {path:?}: {reason}")]
    IndexVerification {
        path: PathBuf,
        expected: String,
        reason: String,
    },

    #[error("Package {name} is not in lookup file {path:?}")]
    NotInIndex { name: String, path: PathBuf },

    #[error("Corrupt record for {name} in {path:?} at offset {offset} (+{length} bytes): {reason}")]
    CorruptRecord {
        name: String,
        path: PathBuf,
        offset: u64,
        length: u32,
        reason: String,
    },
}

impl DeptreeError {
    /// Wraps an error with the package whose subtree could not be resolved.
    pub fn in_package(self, package: impl Into<String>) -> Self {
        DeptreeError::Traversal {
            package: package.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping traversal context.
    pub fn root_cause(&self) -> &DeptreeError {
        match self {
            DeptreeError::Traversal { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
