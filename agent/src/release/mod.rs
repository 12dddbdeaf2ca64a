//! Remote release service access.
//!
//! - [`catalog`] - Published version and artifact listing, plus selection of
//!   the source bundle by name pattern
//! - [`client`] - The [`ReleaseService`] trait and its `ureq` implementation
//! - [`token`] - The short-lived bearer token returned by authentication

pub mod catalog;
pub mod client;
pub mod token;

pub use catalog::{ArtifactDescriptor, ArtifactPattern, ReleaseCatalog};
pub use client::{HttpReleaseService, ReleaseService, RequestError, ServiceEndpoints};
pub use token::AuthToken;
