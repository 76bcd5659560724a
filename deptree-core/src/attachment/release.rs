use super::{Attachment, AttachmentContext, AttachmentValue};
use crate::provider::PackageProvider;
use crate::{DeptreeError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Publish date of a node's version, taken from the registry's `time` map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub published: OffsetDateTime,
}

impl ReleaseInfo {
    pub fn published_rfc3339(&self) -> Option<String> {
        self.published.format(&Rfc3339).ok()
    }
}

pub struct ReleaseAttachment {
    provider: Arc<dyn PackageProvider>,
}

impl ReleaseAttachment {
    pub const KEY: &'static str = "releaseinfo";

    pub fn new(provider: Arc<dyn PackageProvider>) -> Self {
        ReleaseAttachment { provider }
    }
}

#[async_trait]
impl Attachment for ReleaseAttachment {
    async fn apply(&self, ctx: &AttachmentContext<'_>) -> Result<AttachmentValue> {
        let info = self.provider.get_package_info(ctx.name).await?;

        let published = info
            .published_at(ctx.version)
            .ok_or_else(|| DeptreeError::ManifestInvalid {
                package: ctx.full_name(),
                reason: "registry has no publish time for this version".into(),
            })?;

        ctx.logger
            .log(&format!("{} published {}", ctx.full_name(), published.date()));

        Ok(AttachmentValue::new(ReleaseInfo { published }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::NullLogger;
    use crate::manifest::Manifest;
    use crate::provider::MemoryProvider;
    use serde_json::json;

    fn provider() -> Arc<MemoryProvider> {
        let mut provider = MemoryProvider::new();
        provider.insert_document(json!({
            "name": "foo",
            "dist-tags": { "latest": "1.0.0" },
            "versions": {
                "1.0.0": { "name": "foo", "version": "1.0.0" },
                "2.0.0": { "name": "foo", "version": "2.0.0" }
            },
            "time": { "1.0.0": "2019-06-01T12:00:00.000Z" }
        }))
        .unwrap();
        Arc::new(provider)
    }

    #[tokio::test]
    async fn reads_publish_time() {
        let manifest = Manifest::new(json!({ "name": "foo", "version": "1.0.0" }));
        let ctx = AttachmentContext {
            name: "foo",
            version: "1.0.0",
            manifest: &manifest,
            logger: &NullLogger,
        };

        let value = ReleaseAttachment::new(provider()).apply(&ctx).await.unwrap();
        let info = value.downcast_ref::<ReleaseInfo>().unwrap();
        assert_eq!(info.published.year(), 2019);
        assert_eq!(u8::from(info.published.month()), 6);
    }

    #[tokio::test]
    async fn missing_publish_time_is_an_error() {
        let manifest = Manifest::new(json!({ "name": "foo", "version": "2.0.0" }));
        let ctx = AttachmentContext {
            name: "foo",
            version: "2.0.0",
            manifest: &manifest,
            logger: &NullLogger,
        };

        let err = ReleaseAttachment::new(provider()).apply(&ctx).await.unwrap_err();
        assert!(matches!(err, DeptreeError::ManifestInvalid { .. }));
    }
}
