//! The layers this buildpack contributes.
//!
//! # Layout
//!
//! ```text
//! <layers>/
//! ├── pipenv.toml          # [types] build + cache, [metadata] PipenvLayerMetadata
//! ├── pipenv/
//! │   ├── bin/pipenv       # installed by `pip install --user`
//! │   ├── lib/pythonX.Y/site-packages/...
//! │   └── env/PYTHONUSERBASE.override
//! ├── requirements.toml    # [types] build, [metadata] Declarations
//! └── requirements/
//! ```
//!
//! Both are driven by libcnb's `handle_layer`. The pipenv layer is keyed by a
//! fingerprint of the pipenv version and the host platform: a restored layer
//! with the same fingerprint is kept, and libcnb writes its `[types]` back
//! since the lifecycle restores only `[metadata]`. Anything else recreates
//! the layer, and libcnb deletes the old layer and its metadata before
//! [`PipenvLayer::install`] runs. The metadata is written only after the
//! install succeeded, so an interrupted install never looks reusable.

use std::fmt;
use std::path::{Path, PathBuf};

use libcnb::Buildpack;
use libcnb::build::BuildContext;
use libcnb::data::layer_content_metadata::LayerTypes;
use libcnb::generic::GenericMetadata;
use libcnb::layer::{
    ExistingLayerStrategy, Layer, LayerData, LayerResult, LayerResultBuilder, MetadataMigration,
};
use libcnb::layer_env::{LayerEnv, ModificationBehavior, Scope};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::PipenvBuildpack;
use crate::error::BuildpackError;
use crate::plan::Declarations;
use crate::printer::Printer;
use crate::tool::{ToolCommand, ToolRunner, run_checked};

/// Name of the tool layer.
pub const PIPENV_LAYER: &str = "pipenv";

/// Environment variable pointing Python's user scheme at the layer.
pub const PYTHONUSERBASE: &str = "PYTHONUSERBASE";

/// The `[metadata]` table persisted for the pipenv layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipenvLayerMetadata {
    /// See [`fingerprint`].
    pub fingerprint: String,
    /// The installed pipenv version.
    pub version: String,
}

impl PipenvLayerMetadata {
    pub fn for_version(version: &str) -> Self {
        Self {
            fingerprint: fingerprint(version),
            version: version.to_owned(),
        }
    }
}

/// Whether the layer was kept from a previous build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerOutcome {
    Reused,
    Installed,
}

impl fmt::Display for LayerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reused => f.write_str("Reusing cached layer"),
            Self::Installed => f.write_str("Contributing to layer"),
        }
    }
}

/// A ready-to-use pipenv installation.
#[derive(Debug, Clone)]
pub struct ToolLayer {
    /// The layer directory, also the `PYTHONUSERBASE`.
    pub path: PathBuf,
    /// The pipenv version it holds.
    pub version: String,
}

impl ToolLayer {
    /// The `pipenv` entry point.
    pub fn pipenv(&self) -> PathBuf {
        pipenv_bin(&self.path)
    }

    /// A command running pipenv out of this layer.
    pub fn command(&self) -> ToolCommand {
        ToolCommand::new(self.pipenv())
            .env(PYTHONUSERBASE, &self.path)
            .env("PIPENV_NOSPIN", "1")
            .env("PIPENV_YES", "1")
    }
}

fn pipenv_bin(layer_dir: &Path) -> PathBuf {
    layer_dir.join("bin").join("pipenv")
}

/// Compute the cache key for a pipenv installation.
///
/// SHA-256 over the pipenv version and the host OS and architecture, so a
/// cache restored onto a different platform is never reused.
pub fn fingerprint(version: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"pipenv\0");
    hasher.update(version.as_bytes());
    hasher.update(b"\0");
    hasher.update(std::env::consts::OS.as_bytes());
    hasher.update(b"\0");
    hasher.update(std::env::consts::ARCH.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The cached pipenv installation.
pub struct PipenvLayer<'a> {
    version: &'a str,
    python: &'a Path,
    runner: &'a dyn ToolRunner,
    printer: Printer,
}

impl<'a> PipenvLayer<'a> {
    pub fn new(
        version: &'a str,
        python: &'a Path,
        runner: &'a dyn ToolRunner,
        printer: Printer,
    ) -> Self {
        Self {
            version,
            python,
            runner,
            printer,
        }
    }

    /// Decide what to do with a restored layer.
    ///
    /// It is only reused when its fingerprint matches and the entry point
    /// survived the restore.
    pub fn outcome(&self, cached: &PipenvLayerMetadata, layer_dir: &Path) -> LayerOutcome {
        let expected = fingerprint(self.version);
        debug!(
            cached = %cached.fingerprint,
            expected = %expected,
            "comparing layer fingerprints"
        );
        if cached.fingerprint == expected && pipenv_bin(layer_dir).is_file() {
            LayerOutcome::Reused
        } else {
            LayerOutcome::Installed
        }
    }

    /// `pip install --user pipenv==<version>` into `layer_dir`.
    pub fn install(&self, layer_dir: &Path) -> Result<(), BuildpackError> {
        self.printer
            .info(&format!("Installing pipenv {}", self.version));
        let command = ToolCommand::new(self.python)
            .args([
                "-m",
                "pip",
                "install",
                "--user",
                "--disable-pip-version-check",
                "--no-warn-script-location",
            ])
            .arg(format!("pipenv=={}", self.version))
            .env(PYTHONUSERBASE, layer_dir);
        run_checked(self.runner, &command)?;

        let entry_point = pipenv_bin(layer_dir);
        if !entry_point.is_file() {
            return Err(BuildpackError::ToolInvocation {
                command: command.to_string(),
                status: format!("did not install {}", entry_point.display()),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}

impl Layer for PipenvLayer<'_> {
    type Buildpack = PipenvBuildpack;
    type Metadata = PipenvLayerMetadata;

    fn types(&self) -> LayerTypes {
        LayerTypes {
            build: true,
            launch: false,
            cache: true,
        }
    }

    fn create(
        &mut self,
        _context: &BuildContext<Self::Buildpack>,
        layer_path: &Path,
    ) -> Result<LayerResult<Self::Metadata>, <Self::Buildpack as Buildpack>::Error> {
        self.printer.info(&format!(
            "Pipenv {}: {}",
            self.version,
            LayerOutcome::Installed
        ));
        self.install(layer_path)?;

        LayerResultBuilder::new(PipenvLayerMetadata::for_version(self.version))
            .env(LayerEnv::new().chainable_insert(
                Scope::All,
                ModificationBehavior::Override,
                PYTHONUSERBASE,
                layer_path,
            ))
            .build()
    }

    fn existing_layer_strategy(
        &mut self,
        _context: &BuildContext<Self::Buildpack>,
        layer_data: &LayerData<Self::Metadata>,
    ) -> Result<ExistingLayerStrategy, <Self::Buildpack as Buildpack>::Error> {
        match self.outcome(&layer_data.content_metadata.metadata, &layer_data.path) {
            LayerOutcome::Reused => {
                self.printer.info(&format!(
                    "Pipenv {}: {}",
                    self.version,
                    LayerOutcome::Reused
                ));
                Ok(ExistingLayerStrategy::Keep)
            }
            LayerOutcome::Installed => Ok(ExistingLayerStrategy::Recreate),
        }
    }

    fn migrate_incompatible_metadata(
        &mut self,
        _context: &BuildContext<Self::Buildpack>,
        metadata: &GenericMetadata,
    ) -> Result<MetadataMigration<Self::Metadata>, <Self::Buildpack as Buildpack>::Error> {
        debug!(?metadata, "invalid layer metadata");
        self.printer
            .warn(&format!("Ignoring invalid layer metadata for {PIPENV_LAYER}"));
        Ok(MetadataMigration::RecreateLayer)
    }
}

/// Records the build's [`Declarations`]. Never cached: it is rewritten by
/// every successful build and absent after a failed one.
pub struct RequirementsLayer {
    declarations: Declarations,
}

impl RequirementsLayer {
    pub fn new(declarations: Declarations) -> Self {
        Self { declarations }
    }
}

impl Layer for RequirementsLayer {
    type Buildpack = PipenvBuildpack;
    type Metadata = Declarations;

    fn types(&self) -> LayerTypes {
        LayerTypes {
            build: true,
            launch: false,
            cache: false,
        }
    }

    fn create(
        &mut self,
        _context: &BuildContext<Self::Buildpack>,
        _layer_path: &Path,
    ) -> Result<LayerResult<Self::Metadata>, <Self::Buildpack as Buildpack>::Error> {
        LayerResultBuilder::new(self.declarations.clone()).build()
    }

    fn existing_layer_strategy(
        &mut self,
        _context: &BuildContext<Self::Buildpack>,
        _layer_data: &LayerData<Self::Metadata>,
    ) -> Result<ExistingLayerStrategy, <Self::Buildpack as Buildpack>::Error> {
        Ok(ExistingLayerStrategy::Recreate)
    }
}
