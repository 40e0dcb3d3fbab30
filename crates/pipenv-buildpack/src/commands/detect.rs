//! The detect phase.

use std::path::Path;

use libcnb::data::build_plan::BuildPlan;
use libcnb::detect::{DetectResult, DetectResultBuilder};
use tracing::debug;

use crate::error::BuildpackError;
use crate::pipfile::{AppFiles, Pipfile, PipfileLock};
use crate::plan::detect_plan;
use crate::printer::Printer;
use crate::version::{PythonVersionRequirement, resolve_python_version};

/// A passing detection.
#[derive(Debug)]
pub struct Detection {
    pub plan: BuildPlan,
    /// The interpreter version declared in the plan, if any.
    pub python: Option<PythonVersionRequirement>,
}

/// Decide whether `app_dir` is a pipenv application and compute its plan.
///
/// The `python` requirement only carries a version when `Pipfile.lock`
/// records one. A `[requires]` entry in a Pipfile without a lock is not
/// declared: the version pipenv would lock against is not known yet.
pub fn detect(app_dir: &Path, printer: Printer) -> Result<Detection, BuildpackError> {
    let files = AppFiles::discover(app_dir)?;
    let pipfile = Pipfile::from_path(&files.pipfile)?;

    let python = match &files.lockfile {
        Some(path) => {
            let lock = PipfileLock::from_path(path)?;
            let python = resolve_python_version(&lock);
            match &python {
                Some(requirement) => printer.debug(&format!(
                    "Python {} requested by {}",
                    requirement.version, requirement.source
                )),
                None => printer.debug("Pipfile.lock does not pin a Python version"),
            }
            python
        }
        None => {
            if let Some(version) = pipfile.python_version() {
                debug!(version, "ignoring Pipfile [requires] until Pipfile.lock exists");
            }
            printer.debug("No Pipfile.lock found; it will be created during build");
            None
        }
    };

    Ok(Detection {
        plan: detect_plan(python.as_ref())?,
        python,
    })
}

/// Run detection for the lifecycle. A missing `Pipfile` fails detection
/// without an error, so libcnb exits with the skip status.
pub fn execute(
    app_dir: &Path,
    printer: Printer,
) -> libcnb::Result<DetectResult, BuildpackError> {
    debug!(app_dir = %app_dir.display(), "detecting");

    match detect(app_dir, printer) {
        Ok(Detection { plan, python }) => {
            match python {
                Some(python) => {
                    printer.info(&format!("Pipenv application (Python {})", python.version));
                }
                None => printer.info("Pipenv application"),
            }
            DetectResultBuilder::pass().build_plan(plan).build()
        }
        Err(err @ BuildpackError::NoManifestFound { .. }) => {
            printer.info(&err.to_string());
            DetectResultBuilder::fail().build()
        }
        Err(err) => Err(err.into()),
    }
}
