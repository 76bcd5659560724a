pub mod attachment;
pub mod cache;
pub mod config;
pub mod console;
pub mod error;
pub mod logger;
pub mod lookup;
pub mod manifest;
pub mod package;
pub mod provider;
pub mod registry;
pub mod spec;
pub mod visitor;

pub use attachment::{Attachment, AttachmentContext, AttachmentValue, Attachments};
pub use config::DeptreeConfig;
pub use error::DeptreeError;
pub use logger::{ConsoleLogger, Logger, NullLogger};
pub use manifest::{DependencyField, Manifest};
pub use package::{NodeId, PackageNode, PackageTree};
pub use provider::{FlatFileProvider, MemoryProvider, OnlineProvider, PackageProvider};
pub use spec::PackageVersion;
pub use visitor::Visitor;

pub type Result<T> = std::result::Result<T, DeptreeError>;
