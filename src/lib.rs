//! bridgebuild internal library code

pub mod config;
pub mod debug;
pub mod descriptor;
pub mod diagnostics;
pub mod env_vars;
pub mod error;
pub mod extensions;
pub mod paths;
pub mod search_path;
pub mod target;
pub mod toolchain;

#[cfg(test)]
mod test_utils;

// Re-export common types for convenience
pub use config::Config;
pub use debug::{debug_log, init_debug, is_debug_enabled};
pub use descriptor::{BuildDescriptor, BuildSettings, DescriptorError};
pub use env_vars::HostEnvironment;
pub use error::{BuildError, LinkError, Stage};
pub use extensions::{
    BuildArtifact, BuildOptions, BuildReport, ExtensionBuilder, TargetOutcome,
};
pub use paths::{DESCRIPTOR_FILE, OutputLayout, find_descriptor, find_descriptor_in};
pub use search_path::{LibrarySearchPath, LinkSpec, ResolvedLibrary, SearchOrigin};
pub use target::{ExtensionTarget, LibraryName, NativeOptions, TargetError};
pub use toolchain::{Language, Tool, Toolchain, TranslatorSpec};
