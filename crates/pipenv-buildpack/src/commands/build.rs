//! The build phase.
//!
//! A build is a single pass through [`BuildState`]:
//!
//! ```text
//! Start ─▶ ToolReady ─▶ ManifestGenerated ─▶ Declared ─▶ Done
//! ```
//!
//! Any error ends the pass. The declarations are recorded last, so a failed
//! build never declares anything.

use std::path::PathBuf;

use libcnb::build::{BuildContext, BuildResult, BuildResultBuilder};
use libcnb::data::layer_name;
use tracing::{debug, info_span};

use crate::PipenvBuildpack;
use crate::config::{BuildpackConfig, Settings};
use crate::error::BuildpackError;
use crate::layer::{PipenvLayer, RequirementsLayer, ToolLayer};
use crate::pipfile::{AppFiles, PIPFILE_LOCK_NAME, Pipfile, PipfileLock};
use crate::plan::{
    Declarations, PipenvDeclaration, PythonRequirement, RequirementsDeclaration,
};
use crate::printer::Printer;
use crate::requirements::{GeneratorOptions, RequirementsArtifact, generate_requirements};
use crate::tool::{SystemRunner, ToolRunner, run_checked};
use crate::version::{PythonVersionRequirement, resolve_python_version};

/// What a successful build did.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// The pipenv version in the tool layer.
    pub pipenv_version: String,
    /// Whether `Pipfile.lock` had to be created with `pipenv lock`.
    pub locked: bool,
    /// The generated manifest.
    pub requirements_path: PathBuf,
    pub requirements: usize,
    /// The interpreter version declared to the Python provider.
    pub python: Option<PythonVersionRequirement>,
}

enum BuildState {
    Start,
    ToolReady {
        tool: ToolLayer,
    },
    ManifestGenerated {
        tool: ToolLayer,
        lock: PipfileLock,
        locked: bool,
        requirements: RequirementsArtifact,
    },
    Declared(BuildReport),
    Done(BuildReport),
}

impl BuildState {
    fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::ToolReady { .. } => "tool-ready",
            Self::ManifestGenerated { .. } => "manifest-generated",
            Self::Declared(_) => "declared",
            Self::Done(_) => "done",
        }
    }
}

/// Inputs of one build pass.
pub struct Build<'a> {
    pub context: &'a BuildContext<PipenvBuildpack>,
    pub config: &'a BuildpackConfig,
    pub runner: &'a dyn ToolRunner,
    pub printer: Printer,
}

impl Build<'_> {
    /// Drive the state machine to completion.
    pub fn run(&self) -> libcnb::Result<BuildReport, BuildpackError> {
        // Reject ambiguous sources before touching any layer.
        let files = AppFiles::discover(&self.config.app_dir)?;
        for entry in &self.context.buildpack_plan.entries {
            debug!(name = %entry.name, "accepted plan entry");
        }

        let mut state = BuildState::Start;
        loop {
            let _span = info_span!("build", state = state.name()).entered();
            state = match state {
                BuildState::Start => BuildState::ToolReady {
                    tool: self.prepare_tool()?,
                },
                BuildState::ToolReady { tool } => {
                    let (lock, locked) = load_lock(&files, &tool, self.runner, self.printer)?;
                    let requirements =
                        generate(&files, &lock, self.config.generator, self.printer)?;
                    BuildState::ManifestGenerated {
                        tool,
                        lock,
                        locked,
                        requirements,
                    }
                }
                BuildState::ManifestGenerated {
                    tool,
                    lock,
                    locked,
                    requirements,
                } => {
                    let report = BuildReport {
                        pipenv_version: tool.version,
                        locked,
                        requirements_path: files.requirements_path(),
                        requirements: requirements.len(),
                        python: resolve_python_version(&lock),
                    };
                    self.context.handle_layer(
                        layer_name!("requirements"),
                        RequirementsLayer::new(declarations(&report)),
                    )?;
                    BuildState::Declared(report)
                }
                BuildState::Declared(report) => BuildState::Done(report),
                BuildState::Done(report) => return Ok(report),
            };
            debug!(next = state.name(), "advanced");
        }
    }

    fn prepare_tool(&self) -> libcnb::Result<ToolLayer, BuildpackError> {
        let layer = self.context.handle_layer(
            layer_name!("pipenv"),
            PipenvLayer::new(
                &self.config.pipenv_version,
                &self.config.python,
                self.runner,
                self.printer,
            ),
        )?;
        Ok(ToolLayer {
            path: layer.path,
            version: self.config.pipenv_version.clone(),
        })
    }
}

/// Parse `Pipfile.lock`, running `pipenv lock` first when it is missing.
///
/// Returns whether the lock had to be created.
pub fn load_lock(
    files: &AppFiles,
    tool: &ToolLayer,
    runner: &dyn ToolRunner,
    printer: Printer,
) -> Result<(PipfileLock, bool), BuildpackError> {
    if let Some(path) = &files.lockfile {
        return Ok((PipfileLock::from_path(path)?, false));
    }

    let pipfile = Pipfile::from_path(&files.pipfile)?;
    let unpinned = pipfile.unpinned_packages();
    if unpinned.is_empty() {
        printer.info("No Pipfile.lock found, locking dependencies with pipenv");
    } else {
        printer.warn(&format!(
            "No Pipfile.lock found; pipenv will pick the newest releases of: {}",
            unpinned.join(", ")
        ));
    }

    let command = tool.command().arg("lock").current_dir(&files.app_dir);
    run_checked(runner, &command)?;

    let path = files.lockfile_path();
    if !path.is_file() {
        return Err(BuildpackError::ToolInvocation {
            command: command.to_string(),
            status: format!("did not create {PIPFILE_LOCK_NAME}"),
            stderr: String::new(),
        });
    }
    Ok((PipfileLock::from_path(&path)?, true))
}

/// Transcode `lock` into `<app>/requirements.txt`.
pub fn generate(
    files: &AppFiles,
    lock: &PipfileLock,
    options: GeneratorOptions,
    printer: Printer,
) -> Result<RequirementsArtifact, BuildpackError> {
    printer.info("Generating requirements.txt from Pipfile.lock");
    let requirements = generate_requirements(lock, options);
    if requirements.is_empty() {
        printer.warn("Pipfile.lock has no packages to install");
    }
    requirements.write_to(&files.requirements_path())?;
    Ok(requirements)
}

fn declarations(report: &BuildReport) -> Declarations {
    Declarations {
        pipenv: PipenvDeclaration {
            version: report.pipenv_version.clone(),
            build: true,
        },
        python: PythonRequirement::new(report.python.as_ref()),
        requirements: RequirementsDeclaration {
            path: report.requirements_path.to_string_lossy().into_owned(),
            entries: report.requirements,
        },
    }
}

/// Run the build phase for the lifecycle.
pub fn execute(
    context: &BuildContext<PipenvBuildpack>,
    settings: Settings<'_>,
    printer: Printer,
) -> libcnb::Result<BuildResult, BuildpackError> {
    let config = BuildpackConfig::resolve(context.app_dir.clone(), settings)?;

    printer.header("Pipenv Buildpack");
    let report = Build {
        context,
        config: &config,
        runner: &SystemRunner,
        printer,
    }
    .run()?;

    printer.info(&format!(
        "Wrote {} ({} {})",
        report.requirements_path.display(),
        report.requirements,
        if report.requirements == 1 {
            "entry"
        } else {
            "entries"
        }
    ));
    if let Some(python) = &report.python {
        printer.info(&format!("Requested Python {} from {}", python.version, python.source));
    }
    BuildResultBuilder::new().build()
}
