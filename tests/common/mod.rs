//! Common test utilities and helpers
//!
//! This module provides shared functionality used across integration tests:
//! - Binary path resolution (via `get_bridgebuild_binary`)
//! - Project fixtures and fake native libraries (via `helpers`)

pub(crate) mod helpers;

#[allow(unused_imports)]
pub(crate) use helpers::get_bridgebuild_binary;
