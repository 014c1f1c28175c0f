//! Language server core for Pkl.
//!
//! This crate provides:
//! - The workspace of open modules and its cached diagnostics
//! - Module URI resolution, including `@dependency/...` notation
//! - `PklProject` dependency descriptors
//! - Server settings
//! - Completion, go-to-definition and hover entry points
//!
//! The JSON-RPC transport lives outside this crate.

pub mod completion;
pub mod definition;
pub mod hover;
pub mod project;
pub mod resolver;
pub mod settings;
pub mod workspace;

pub use definition::Location;
pub use hover::HoverInfo;
pub use project::{DependencyTarget, PackageUri, ProjectDescriptor, Version};
pub use resolver::{ModuleResolver, ResolutionFailure, file_uri};
pub use settings::{AnalyzerSettings, ServerSettings};
pub use workspace::Workspace;

/// Install the tracing subscriber, using the settings' log level when the
/// environment configures none.
pub fn init_logging(settings: &ServerSettings) {
    pkl_common::tracing_config::init_tracing_with(settings.log_level.as_deref());
}
