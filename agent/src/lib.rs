//! relbuild agent library.
//!
//! This crate provides the core functionality for tracking a remote release
//! feed and rebuilding its latest source bundle: credential handling, the
//! release service client, archive extraction, build orchestration, and the
//! version marker that makes a run idempotent. It is used by the `relbuild`
//! CLI binary and can be consumed programmatically for testing or custom
//! scheduling.
//!
//! # Modules
//!
//! - [`build`] - Configure and compile steps with live output streaming
//! - [`bundle`] - Source bundle paths and archive format, resolved once
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - `relbuild.toml` loading and run settings
//! - [`credential`] - Credential file decoding
//! - [`error`] - Semantic error types and exit codes
//! - [`extraction`] - Compressed tar extraction with traversal protection
//! - [`harvest`] - Moving binaries into the output directory
//! - [`marker`] - The persisted version marker and version gate
//! - [`output`] - Operator-facing progress messages
//! - [`pipeline`] - End-to-end update run orchestration
//! - [`release`] - Release service client and catalog model
//! - [`status`] - Read-only version status report

pub mod build;
pub mod bundle;
pub mod cli;
pub mod config;
pub mod credential;
pub mod error;
pub mod extraction;
pub mod harvest;
pub mod marker;
pub mod output;
pub mod pipeline;
pub mod release;
pub mod status;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
