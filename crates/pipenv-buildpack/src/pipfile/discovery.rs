//! Locate the dependency manifests in an application root.
//!
//! Unlike the pipenv CLI, a buildpack never walks up past the application
//! root: the platform hands us exactly one directory and nothing above it
//! belongs to the application.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::BuildpackError;

/// The Pipfile name.
pub const PIPFILE_NAME: &str = "Pipfile";

/// The lockfile name.
pub const PIPFILE_LOCK_NAME: &str = "Pipfile.lock";

/// The generated (or user-authored) requirements file name.
pub const REQUIREMENTS_NAME: &str = "requirements.txt";

/// The manifests present in an application root.
#[derive(Debug, Clone)]
pub struct AppFiles {
    /// The application root.
    pub app_dir: PathBuf,
    /// `<app>/Pipfile`.
    pub pipfile: PathBuf,
    /// `<app>/Pipfile.lock`, when present.
    pub lockfile: Option<PathBuf>,
}

impl AppFiles {
    /// Inspect `app_dir` and apply the applicability rules.
    ///
    /// Fails with [`BuildpackError::NoManifestFound`] when there is no
    /// `Pipfile`, and with [`BuildpackError::ConflictingManifests`] when a
    /// `requirements.txt` sits next to it.
    pub fn discover(app_dir: &Path) -> Result<Self, BuildpackError> {
        let pipfile = app_dir.join(PIPFILE_NAME);
        if !pipfile.is_file() {
            return Err(BuildpackError::NoManifestFound {
                app_dir: app_dir.to_path_buf(),
            });
        }

        if app_dir.join(REQUIREMENTS_NAME).exists() {
            return Err(BuildpackError::ConflictingManifests {
                app_dir: app_dir.to_path_buf(),
            });
        }

        let lockfile = Some(app_dir.join(PIPFILE_LOCK_NAME)).filter(|path| path.is_file());
        debug!(
            app_dir = %app_dir.display(),
            lockfile = lockfile.is_some(),
            "found Pipfile"
        );

        Ok(Self {
            app_dir: app_dir.to_path_buf(),
            pipfile,
            lockfile,
        })
    }

    /// Where the generated manifest is written.
    pub fn requirements_path(&self) -> PathBuf {
        self.app_dir.join(REQUIREMENTS_NAME)
    }

    /// Where `Pipfile.lock` lives (or will be written by `pipenv lock`).
    pub fn lockfile_path(&self) -> PathBuf {
        self.app_dir.join(PIPFILE_LOCK_NAME)
    }
}
