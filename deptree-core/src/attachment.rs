use crate::logger::Logger;
use crate::manifest::{Manifest, lookup_path};
use crate::{DeptreeError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub mod release;

pub use release::{ReleaseAttachment, ReleaseInfo};

/// Type-erased attachment payload with checked typed access.
#[derive(Clone)]
pub struct AttachmentValue {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl AttachmentValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        AttachmentValue {
            value: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for AttachmentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentValue")
            .field("type", &self.type_name)
            .finish()
    }
}

/// Read-only view of the node an attachment runs against.
pub struct AttachmentContext<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub manifest: &'a Manifest,
    pub logger: &'a dyn Logger,
}

impl AttachmentContext<'_> {
    pub fn full_name(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    pub fn data(&self, path: &str) -> Option<&Value> {
        lookup_path(self.manifest.raw(), path)
    }
}

#[async_trait]
pub trait Attachment: Send + Sync {
    async fn apply(&self, ctx: &AttachmentContext<'_>) -> Result<AttachmentValue>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentFailure {
    pub package: String,
    pub key: String,
    pub reason: String,
}

impl From<AttachmentFailure> for DeptreeError {
    fn from(failure: AttachmentFailure) -> Self {
        DeptreeError::AttachmentFailed {
            package: failure.package,
            key: failure.key,
            reason: failure.reason,
        }
    }
}

/// What one pipeline run produced for a node.
#[derive(Debug, Default)]
pub struct AttachmentReport {
    pub data: BTreeMap<String, AttachmentValue>,
    pub failures: Vec<AttachmentFailure>,
}

/// Insertion-ordered registry of named attachments. A failing attachment is
/// logged and recorded in the [`AttachmentReport`]; it never stops the node
/// from being built or the other attachments from running.
#[derive(Clone, Default)]
pub struct Attachments {
    entries: Vec<(String, Arc<dyn Attachment>)>,
}

impl Attachments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `attachment` under `key`, replacing any earlier one with the
    /// same key in place.
    pub fn with(mut self, key: impl Into<String>, attachment: impl Attachment + 'static) -> Self {
        self.insert(key, Arc::new(attachment));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, attachment: Arc<dyn Attachment>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = attachment,
            None => self.entries.push((key, attachment)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn run(&self, ctx: &AttachmentContext<'_>) -> AttachmentReport {
        let mut report = AttachmentReport::default();

        for (key, attachment) in &self.entries {
            let scoped = ctx.logger.scope(key);
            let scoped_ctx = AttachmentContext {
                name: ctx.name,
                version: ctx.version,
                manifest: ctx.manifest,
                logger: scoped.as_ref(),
            };

            match attachment.apply(&scoped_ctx).await {
                Ok(value) => {
                    report.data.insert(key.clone(), value);
                }
                Err(err) => {
                    scoped.error(&format!("{}: {}", scoped_ctx.full_name(), err));
                    report.failures.push(AttachmentFailure {
                        package: scoped_ctx.full_name(),
                        key: key.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        report
    }
}

impl fmt::Debug for Attachments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.keys()).finish()
    }
}
