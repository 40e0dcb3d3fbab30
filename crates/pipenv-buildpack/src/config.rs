//! Per-invocation configuration.
//!
//! Every setting is resolved once, up front, into a [`BuildpackConfig`] that
//! is passed explicitly to the components that need it. Resolution order for
//! each setting:
//!
//! 1. the process environment the lifecycle started us with,
//! 2. the CNB platform environment (`<platform>/env/<NAME>`), as loaded by
//!    libcnb into [`GenericPlatform`](libcnb::generic::GenericPlatform),
//! 3. the built-in default.

use std::path::PathBuf;

use libcnb::Env;
use tracing::debug;

use crate::error::BuildpackError;
use crate::requirements::GeneratorOptions;

/// The pipenv release installed when nothing else is configured.
pub const DEFAULT_PIPENV_VERSION: &str = "2023.12.1";

/// The interpreter used to pip-install pipenv when nothing else is configured.
pub const DEFAULT_PYTHON: &str = "python3";

pub const PIPENV_VERSION_VAR: &str = "BP_PIPENV_VERSION";
pub const PYTHON_VAR: &str = "BP_PIPENV_PYTHON";
pub const INCLUDE_DEV_VAR: &str = "BP_PIPENV_INCLUDE_DEV";
pub const INCLUDE_HASHES_VAR: &str = "BP_PIPENV_INCLUDE_HASHES";

/// Build log verbosity, following the Paketo convention.
pub const LOG_LEVEL_VAR: &str = "BP_LOG_LEVEL";

/// The two environments a setting is looked up in.
#[derive(Clone, Copy)]
pub struct Settings<'a> {
    process: &'a Env,
    platform: &'a Env,
}

impl<'a> Settings<'a> {
    pub fn new(process: &'a Env, platform: &'a Env) -> Self {
        Self { process, platform }
    }

    /// The first non-empty value of `name`, trailing newlines trimmed.
    pub fn get(&self, name: &str) -> Option<String> {
        [self.process, self.platform].into_iter().find_map(|env| {
            let value = env.get(name)?;
            let value = value.to_string_lossy();
            let value = value.trim_end_matches(['\n', '\r']);
            (!value.is_empty()).then(|| value.to_owned())
        })
    }

    /// Interpret a variable as a boolean flag.
    pub fn flag(&self, name: &'static str) -> Result<Option<bool>, BuildpackError> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(BuildpackError::InvalidSetting {
                name,
                value,
                expected: "expected true or false",
            }),
        }
    }

    /// `BP_LOG_LEVEL=DEBUG` turns on debug output.
    pub fn verbosity(&self) -> u8 {
        match self.get(LOG_LEVEL_VAR) {
            Some(level) if level.trim().eq_ignore_ascii_case("debug") => 1,
            _ => 0,
        }
    }
}

/// Resolved settings for one build invocation.
#[derive(Debug, Clone)]
pub struct BuildpackConfig {
    /// The application root.
    pub app_dir: PathBuf,
    /// The pipenv version to install into the tool layer.
    pub pipenv_version: String,
    /// The interpreter that runs `pip install pipenv`.
    pub python: PathBuf,
    /// Requirements generator options.
    pub generator: GeneratorOptions,
}

impl BuildpackConfig {
    /// Resolve the build settings for `app_dir`.
    pub fn resolve(app_dir: PathBuf, settings: Settings<'_>) -> Result<Self, BuildpackError> {
        let pipenv_version = match settings.get(PIPENV_VERSION_VAR) {
            Some(version) => version.trim().to_owned(),
            None => DEFAULT_PIPENV_VERSION.to_owned(),
        };
        if pipenv_version.is_empty() {
            return Err(BuildpackError::InvalidSetting {
                name: PIPENV_VERSION_VAR,
                value: pipenv_version,
                expected: "expected a pipenv release",
            });
        }

        let python = PathBuf::from(
            settings
                .get(PYTHON_VAR)
                .unwrap_or_else(|| DEFAULT_PYTHON.to_owned()),
        );

        let config = Self {
            app_dir,
            pipenv_version,
            python,
            generator: GeneratorOptions {
                include_dev: settings.flag(INCLUDE_DEV_VAR)?.unwrap_or(false),
                include_hashes: settings.flag(INCLUDE_HASHES_VAR)?.unwrap_or(false),
            },
        };
        debug!(?config, "resolved configuration");
        Ok(config)
    }
}
