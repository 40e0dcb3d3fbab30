//! Extract the interpreter version a lockfile was resolved for.
//!
//! This is a pure lookup: the constraint is handed to the Python provider
//! exactly as pipenv recorded it, and any range evaluation happens there.

use std::fmt;

use crate::pipfile::{PIPFILE_LOCK_NAME, PipfileLock};

/// An interpreter version constraint together with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonVersionRequirement {
    /// The constraint, verbatim (e.g., `"3.11.4"` or `"3.11"`).
    pub version: String,
    /// Where the constraint was read from.
    pub source: VersionSource,
}

/// Provenance of a [`PythonVersionRequirement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    /// `_meta.requires` of `Pipfile.lock`.
    Lockfile,
}

impl VersionSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lockfile => PIPFILE_LOCK_NAME,
        }
    }
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the Python version requirement recorded in `lock`.
///
/// `python_full_version` is preferred over `python_version`. Empty or
/// whitespace-only values count as absent. Returns `None` when the lock does
/// not constrain the interpreter.
pub fn resolve_python_version(lock: &PipfileLock) -> Option<PythonVersionRequirement> {
    let requires = &lock.meta.requires;
    [
        requires.python_full_version.as_deref(),
        requires.python_version.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|version| !version.trim().is_empty())
    .map(|version| PythonVersionRequirement {
        version: version.to_owned(),
        source: VersionSource::Lockfile,
    })
}
