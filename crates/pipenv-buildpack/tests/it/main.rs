//! Integration tests for pipenv-buildpack.
//!
//! Following the single-integration-test pattern from:
//! <https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html>

// The lifecycle contract (`bin/detect`, `bin/build`, shell tool stand-ins)
// is exercised on Unix only.
#[cfg(unix)]
pub(crate) mod common;

#[cfg(unix)]
mod detect;
