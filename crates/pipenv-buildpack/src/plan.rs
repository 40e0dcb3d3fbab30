//! Build plan entries this buildpack provides and requires.
//!
//! Detection hands a [`BuildPlan`] to libcnb, which writes it for the
//! lifecycle. The build phase cannot amend the plan it was given, so the
//! versions it settled on are recorded as [`Declarations`] in the metadata of
//! the uncached `requirements` layer.

use libcnb::data::build_plan::{BuildPlan, BuildPlanBuilder, Require};
use serde::{Deserialize, Serialize};

use crate::error::BuildpackError;
use crate::version::PythonVersionRequirement;

/// Dependency names used in the build plan.
pub const PIPENV: &str = "pipenv";
pub const PYTHON: &str = "python";
pub const REQUIREMENTS: &str = "requirements";

/// Metadata of a requirement that is only needed at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildRequirement {
    pub build: bool,
}

/// Metadata of the `python` requirement: needed at build time to run pipenv,
/// pinned to the lockfile's interpreter when one is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PythonRequirement {
    pub build: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(
        rename = "version-source",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub version_source: Option<String>,
}

impl PythonRequirement {
    pub fn new(requirement: Option<&PythonVersionRequirement>) -> Self {
        Self {
            build: true,
            version: requirement.map(|requirement| requirement.version.clone()),
            version_source: requirement.map(|requirement| requirement.source.to_string()),
        }
    }
}

/// The detect-phase plan: provides `pipenv` and `requirements`, requires
/// `pipenv` and `python` at build time.
pub fn detect_plan(
    python: Option<&PythonVersionRequirement>,
) -> Result<BuildPlan, BuildpackError> {
    let pipenv = require(PIPENV, BuildRequirement { build: true })?;
    let python = require(PYTHON, PythonRequirement::new(python))?;

    Ok(BuildPlanBuilder::new()
        .provides(PIPENV)
        .provides(REQUIREMENTS)
        .requires(pipenv)
        .requires(python)
        .build())
}

fn require(name: &str, metadata: impl Serialize) -> Result<Require, BuildpackError> {
    let mut require = Require::new(name);
    require
        .metadata(metadata)
        .map_err(|err| BuildpackError::PlanMetadata {
            name: name.to_owned(),
            message: err.to_string(),
        })?;
    Ok(require)
}

/// `pipenv` as installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipenvDeclaration {
    pub version: String,
    pub build: bool,
}

/// Where the generated manifest was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequirementsDeclaration {
    pub path: String,
    pub entries: usize,
}

/// What a successful build settled on, one table per plan entry name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declarations {
    pub pipenv: PipenvDeclaration,
    pub python: PythonRequirement,
    pub requirements: RequirementsDeclaration,
}
