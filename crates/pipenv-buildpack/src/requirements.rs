//! `requirements.txt` generation from `Pipfile.lock`.
//!
//! The generator is a format transcoder: every line carries the pin pipenv
//! recorded, nothing is re-resolved or widened. Entries come out in the
//! lockfile's key order (lexical by package name), so an unchanged lock always
//! produces byte-identical output.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::BuildpackError;
use crate::pipfile::{LockedPackage, PipfileLock};

/// Knobs for [`generate_requirements`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratorOptions {
    /// Include the `develop` section.
    pub include_dev: bool,
    /// Append `--hash` options to registry pins.
    pub include_hashes: bool,
}

/// A rendered `requirements.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementsArtifact {
    content: String,
    entries: usize,
}

impl RequirementsArtifact {
    /// The file content, newline-terminated (empty for an empty lock).
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of requirement lines.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Replace the file at `path` with this artifact.
    ///
    /// The content goes to a sibling temp file first and is renamed into place,
    /// so readers see either the previous manifest or the complete new one.
    pub fn write_to(&self, path: &Path) -> Result<(), BuildpackError> {
        let to_error = |source| BuildpackError::ManifestWrite {
            path: path.to_path_buf(),
            source,
        };
        let temp_path = path.with_extension("txt.tmp");
        fs_err::write(&temp_path, &self.content).map_err(to_error)?;
        fs_err::rename(&temp_path, path).map_err(to_error)?;
        debug!(path = %path.display(), entries = self.entries, "wrote requirements");
        Ok(())
    }
}

/// Render the locked packages of `lock` as a pip requirements file.
pub fn generate_requirements(lock: &PipfileLock, options: GeneratorOptions) -> RequirementsArtifact {
    let mut selected: BTreeMap<&str, &LockedPackage> = lock
        .default
        .iter()
        .map(|(name, package)| (name.as_str(), package))
        .collect();

    if options.include_dev {
        for (name, package) in &lock.develop {
            selected.entry(name.as_str()).or_insert(package);
        }
    }

    let mut content = String::new();
    for (name, package) in &selected {
        content.push_str(&render_entry(name, package, options.include_hashes));
        content.push('\n');
    }

    RequirementsArtifact {
        content,
        entries: selected.len(),
    }
}

/// Render a single locked package as one requirements line.
fn render_entry(name: &str, package: &LockedPackage, include_hashes: bool) -> String {
    let extras = format_extras(&package.extras);

    let mut line = if let Some(ref git) = package.git {
        let mut url = format!("git+{git}");
        if let Some(ref git_ref) = package.git_ref {
            url.push('@');
            url.push_str(git_ref);
        }
        if package.editable {
            // Extras ride on the egg fragment; pip reads `subdirectory` from
            // the same fragment.
            let mut line = format!("-e {url}#egg={name}{extras}");
            if let Some(ref subdirectory) = package.subdirectory {
                line.push_str("&subdirectory=");
                line.push_str(subdirectory);
            }
            line
        } else {
            if let Some(ref subdirectory) = package.subdirectory {
                url.push_str("#subdirectory=");
                url.push_str(subdirectory);
            }
            format!("{name}{extras} @ {url}")
        }
    } else if let Some(ref path) = package.path {
        let target = if extras.is_empty() {
            path.clone()
        } else {
            format!("{path}{extras}")
        };
        if package.editable {
            format!("-e {target}")
        } else {
            target
        }
    } else if let Some(ref file) = package.file {
        format!("{name}{extras} @ {file}")
    } else {
        let mut line = format!("{name}{extras}");
        if let Some(ref version) = package.version {
            line.push_str(version.trim());
        }
        if include_hashes {
            let mut hashes: Vec<&str> = package.hashes.iter().map(String::as_str).collect();
            hashes.sort_unstable();
            hashes.dedup();
            for hash in hashes {
                line.push_str(" --hash=");
                line.push_str(hash);
            }
        }
        line
    };

    if let Some(ref markers) = package.markers {
        let markers = markers.trim();
        if !markers.is_empty() {
            line.push_str("; ");
            line.push_str(markers);
        }
    }

    line
}

/// Format extras as `[a,b]`, sorted so the output does not depend on the
/// order pipenv happened to record them in.
fn format_extras(extras: &[String]) -> String {
    if extras.is_empty() {
        return String::new();
    }
    let mut extras: Vec<&str> = extras.iter().map(String::as_str).collect();
    extras.sort_unstable();
    extras.dedup();
    format!("[{}]", extras.join(","))
}
