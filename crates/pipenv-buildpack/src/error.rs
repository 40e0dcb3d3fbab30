//! Error taxonomy for the detect and build phases.
//!
//! Every failure the buildpack can report maps onto one [`BuildpackError`]
//! variant. It is the `Error` type of the [`crate::PipenvBuildpack`], so libcnb
//! carries it to [`libcnb::Buildpack::on_error`] and exits non-zero. Failures
//! inside libcnb itself (unreadable plan, layer handling) arrive there as the
//! other [`libcnb::Error`] variants.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while detecting or building.
#[derive(Debug, Error)]
pub enum BuildpackError {
    /// The application root has no `Pipfile`. Not a failure from the
    /// platform's point of view: detection simply does not pass.
    #[error("no Pipfile found in {}", .app_dir.display())]
    NoManifestFound { app_dir: PathBuf },

    /// Both a `Pipfile` and a user-authored `requirements.txt` exist.
    #[error(
        "found Pipfile + requirements.txt in {}: remove one of them so the \
         dependency source is unambiguous",
        .app_dir.display()
    )]
    ConflictingManifests { app_dir: PathBuf },

    /// `Pipfile.lock` is not a well-formed lockfile.
    #[error("failed to parse {}", .path.display())]
    LockParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// `Pipfile` is not valid TOML or does not match the Pipfile schema.
    #[error("failed to parse {}", .path.display())]
    PipfileParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// An external tool could not be spawned or exited unsuccessfully.
    #[error("`{command}` {status}{}", format_stderr(.stderr))]
    ToolInvocation {
        command: String,
        status: String,
        stderr: String,
    },

    /// The generated `requirements.txt` could not be written.
    #[error("failed to write {}", .path.display())]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A build plan entry could not carry its metadata.
    #[error("invalid metadata for build plan entry `{name}`: {message}")]
    PlanMetadata { name: String, message: String },

    /// A `BP_PIPENV_*` setting has a value the buildpack cannot use.
    #[error("invalid value `{value}` for {name}: {expected}")]
    InvalidSetting {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<BuildpackError> for libcnb::Error<BuildpackError> {
    fn from(error: BuildpackError) -> Self {
        Self::BuildpackError(error)
    }
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{trimmed}")
    }
}
