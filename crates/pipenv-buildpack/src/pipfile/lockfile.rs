//! `Pipfile.lock` data model.
//!
//! A `Pipfile.lock` is a JSON document written by `pipenv lock`:
//!
//! ```json
//! {
//!     "_meta": {
//!         "hash": {"sha256": "..."},
//!         "pipfile-spec": 6,
//!         "requires": {"python_version": "3.11"},
//!         "sources": [{"name": "pypi", "url": "https://pypi.org/simple", "verify_ssl": true}]
//!     },
//!     "default": {"flask": {"hashes": ["sha256:..."], "version": "==2.0.0"}},
//!     "develop": {}
//! }
//! ```
//!
//! Package tables are kept in [`BTreeMap`]s so iteration is always lexical by
//! package name, which the requirements generator relies on for stable output.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::BuildpackError;

/// A parsed `Pipfile.lock`.
#[derive(Debug, Default, Deserialize)]
pub struct PipfileLock {
    #[serde(rename = "_meta", default)]
    pub meta: PipfileLockMeta,
    /// Locked `[packages]`.
    #[serde(default)]
    pub default: BTreeMap<String, LockedPackage>,
    /// Locked `[dev-packages]`.
    #[serde(default)]
    pub develop: BTreeMap<String, LockedPackage>,
}

impl PipfileLock {
    /// Read and parse a `Pipfile.lock` from disk.
    pub fn from_path(path: &Path) -> Result<Self, BuildpackError> {
        let content = fs_err::read_to_string(path)?;
        Self::from_json(&content, path)
    }

    /// Parse lockfile content; `path` is only used for diagnostics.
    pub fn from_json(content: &str, path: &Path) -> Result<Self, BuildpackError> {
        serde_json::from_str(content).map_err(|source| BuildpackError::LockParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `_meta`.
#[derive(Debug, Default, Deserialize)]
pub struct PipfileLockMeta {
    /// Digest of the Pipfile the lock was created from.
    pub hash: Option<PipfileLockHash>,
    #[serde(rename = "pipfile-spec")]
    pub pipfile_spec: Option<u32>,
    /// Python requirements copied from the Pipfile.
    #[serde(default)]
    pub requires: PipfileLockRequires,
    #[serde(default)]
    pub sources: Vec<PipfileLockSource>,
}

/// `_meta.hash`.
#[derive(Debug, Deserialize)]
pub struct PipfileLockHash {
    pub sha256: String,
}

/// `_meta.requires`: the interpreter the lock was resolved for.
#[derive(Debug, Default, Deserialize)]
pub struct PipfileLockRequires {
    /// Short Python version (e.g., `"3.11"`).
    pub python_version: Option<String>,
    /// Full Python version (e.g., `"3.11.4"`).
    pub python_full_version: Option<String>,
}

/// One of `_meta.sources`.
#[derive(Debug, Deserialize)]
pub struct PipfileLockSource {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub verify_ssl: bool,
}

/// One resolved distribution. Exactly one of `version`, `git`, `path`
/// or `file` normally identifies it.
#[derive(Debug, Default, Deserialize)]
pub struct LockedPackage {
    /// Distribution hashes (`"sha256:<hex>"`).
    #[serde(default)]
    pub hashes: Vec<String>,
    /// Name of the `_meta.sources` entry it came from.
    pub index: Option<String>,
    pub markers: Option<String>,
    /// The pin, operator included (`"==1.2.3"`).
    pub version: Option<String>,
    /// Requested extras.
    #[serde(default)]
    pub extras: Vec<String>,
    /// Git repository URL.
    pub git: Option<String>,
    /// Resolved git ref.
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    /// Subdirectory inside a VCS checkout.
    pub subdirectory: Option<String>,
    pub path: Option<String>,
    /// Direct file or archive URL.
    pub file: Option<String>,
    #[serde(default)]
    pub editable: bool,
}
