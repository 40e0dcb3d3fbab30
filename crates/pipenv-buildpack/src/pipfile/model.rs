//! The `Pipfile` schema, as far as the buildpack reads it.
//!
//! Detection only needs to know the file is well-formed; the build reads it
//! when there is no lock yet, to report what `pipenv lock` is about to
//! resolve. Unread sections (`[scripts]`, `[pipenv]`) are ignored.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::BuildpackError;

/// A parsed `Pipfile`.
#[derive(Debug, Default, Deserialize)]
pub struct Pipfile {
    #[serde(default)]
    pub source: Vec<PipfileSource>,

    #[serde(default)]
    pub packages: BTreeMap<String, PipfilePackage>,

    #[serde(rename = "dev-packages", default)]
    pub dev_packages: BTreeMap<String, PipfilePackage>,

    pub requires: Option<PipfileRequires>,
}

impl Pipfile {
    /// Read and parse `path`.
    pub fn from_path(path: &Path) -> Result<Self, BuildpackError> {
        let content = fs_err::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| BuildpackError::PipfileParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Names of `[packages]` entries left open, i.e. that `pipenv lock` will
    /// have to resolve.
    pub fn unpinned_packages(&self) -> Vec<&str> {
        self.packages
            .iter()
            .filter(|(_, package)| !package.is_pinned())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// `[requires]`, full version first.
    pub fn python_version(&self) -> Option<&str> {
        let requires = self.requires.as_ref()?;
        requires
            .python_full_version
            .as_deref()
            .or(requires.python_version.as_deref())
    }
}

/// `[[source]]`.
#[derive(Debug, Deserialize)]
pub struct PipfileSource {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
}

/// One `[packages]` value: `flask = "==2.0.0"` or
/// `flask = {version = "==2.0.0", extras = ["async"]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PipfilePackage {
    Simple(String),
    Detailed(PipfilePackageDetail),
}

impl PipfilePackage {
    /// Whether the entry names one exact distribution: an `==`/`===` pin,
    /// a VCS reference at a fixed ref, or a local path.
    pub fn is_pinned(&self) -> bool {
        match self {
            Self::Simple(version) => is_exact_specifier(version),
            Self::Detailed(detail) => {
                if detail.git.is_some() {
                    return detail.git_ref.is_some();
                }
                if detail.path.is_some() {
                    return true;
                }
                detail.version.as_deref().is_some_and(is_exact_specifier)
            }
        }
    }
}

fn is_exact_specifier(version: &str) -> bool {
    let version = version.trim();
    version.starts_with("==") && !version.ends_with('*')
}

/// The table form of a [`PipfilePackage`].
#[derive(Debug, Default, Deserialize)]
pub struct PipfilePackageDetail {
    pub version: Option<String>,
    #[serde(default)]
    pub extras: Vec<String>,
    pub markers: Option<String>,
    pub git: Option<String>,
    /// Branch, tag, or commit.
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    pub path: Option<String>,
    #[serde(default)]
    pub editable: bool,
    pub index: Option<String>,
}

/// `[requires]`.
#[derive(Debug, Deserialize)]
pub struct PipfileRequires {
    pub python_version: Option<String>,
    pub python_full_version: Option<String>,
}

fn default_true() -> bool {
    true
}
