//! Native extension building
//!
//! Turns an [`ExtensionTarget`](crate::target::ExtensionTarget) into one
//! loadable module:
//! ```text
//! <translator> src/pkgcraft.pyx -> pkgcraft.c
//! cc -fPIC -c pkgcraft.c -o pkgcraft.o
//! cc -shared pkgcraft.o -o pkgcraft.so -lpkgcraft
//! mv pkgcraft.so <out_dir>/
//! ```

pub mod bridge;
pub mod builder;
pub mod fingerprint;
pub mod types;

pub use builder::{BuildOptions, ExtensionBuilder};
pub use types::{BuildArtifact, BuildReport, TargetOutcome};
