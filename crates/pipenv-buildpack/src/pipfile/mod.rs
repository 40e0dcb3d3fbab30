//! Pipfile and `Pipfile.lock` parsing.
//!
//! - [`discovery`] finds the manifests in the application root and enforces
//!   the "Pipfile xor requirements.txt" rule.
//! - [`model`] mirrors the Pipfile TOML schema.
//! - [`lockfile`] mirrors the `Pipfile.lock` JSON schema.

pub mod discovery;
pub mod lockfile;
pub mod model;

pub use discovery::{AppFiles, PIPFILE_LOCK_NAME, PIPFILE_NAME, REQUIREMENTS_NAME};
pub use lockfile::{LockedPackage, PipfileLock};
pub use model::Pipfile;
