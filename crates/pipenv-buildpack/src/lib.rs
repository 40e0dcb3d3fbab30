//! pipenv-buildpack: a Cloud Native Buildpack for Pipfile-based applications.
//!
//! [`PipenvBuildpack`] implements libcnb's [`Buildpack`] trait. Detection
//! recognizes an application by its `Pipfile`; the build installs pipenv
//! into a cached layer, transcodes `Pipfile.lock` into `requirements.txt`,
//! and declares the Python version the lock was resolved against.

#![deny(clippy::print_stdout, clippy::print_stderr)]

use anstream::eprintln;
use libcnb::build::{BuildContext, BuildResult};
use libcnb::detect::{DetectContext, DetectResult};
use libcnb::generic::{GenericMetadata, GenericPlatform};
use libcnb::{Buildpack, Env, Platform};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::error::BuildpackError;
use crate::printer::Printer;

pub mod commands;
pub mod config;
pub mod error;
pub mod layer;
pub mod pipfile;
pub mod plan;
pub mod printer;
pub mod requirements;
pub mod tool;
pub mod version;

/// The pipenv buildpack.
pub struct PipenvBuildpack;

impl Buildpack for PipenvBuildpack {
    type Platform = GenericPlatform;
    type Metadata = GenericMetadata;
    type Error = BuildpackError;

    fn detect(&self, context: DetectContext<Self>) -> libcnb::Result<DetectResult, Self::Error> {
        let process = Env::from_current();
        let printer = start("detect", Settings::new(&process, context.platform.env()));
        commands::detect::execute(&context.app_dir, printer)
    }

    fn build(&self, context: BuildContext<Self>) -> libcnb::Result<BuildResult, Self::Error> {
        let process = Env::from_current();
        let settings = Settings::new(&process, context.platform.env());
        let printer = start("build", settings);
        commands::build::execute(&context, settings, printer)
    }

    fn on_error(&self, error: libcnb::Error<Self::Error>) {
        report_error(&error);
    }
}

/// Set up output for a phase.
fn start(phase: &str, settings: Settings<'_>) -> Printer {
    let verbosity = settings.verbosity();
    setup_logging(verbosity);
    tracing::debug!(phase, "starting");
    Printer::new(verbosity, false)
}

/// Route `tracing` output to stderr. `RUST_LOG` takes precedence over
/// `BP_LOG_LEVEL`.
fn setup_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        _ => "pipenv_buildpack=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

/// Print a failed phase's error and its causes.
fn report_error(error: &libcnb::Error<BuildpackError>) {
    let printer = Printer::new(0, false);
    match error {
        libcnb::Error::BuildpackError(error) => {
            printer.error(&error.to_string());
            let mut source = std::error::Error::source(error);
            while let Some(cause) = source {
                eprintln!(
                    "  {}: {}",
                    "Caused by".red().bold(),
                    cause.to_string().trim()
                );
                source = cause.source();
            }
        }
        error => printer.error(&error.to_string()),
    }
}
