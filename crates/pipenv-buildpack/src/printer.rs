//! Build log output.
//!
//! The [`Printer`] writes the human-readable build log to stderr. Debug lines
//! appear with `BP_LOG_LEVEL=DEBUG`; errors are always printed, even by a
//! quiet printer. Structured diagnostics go through `tracing` instead.

use anstream::eprintln;
use owo_colors::OwoColorize;

/// Controls output formatting for the detect and build phases.
#[derive(Copy, Clone, Debug)]
pub struct Printer {
    /// Verbosity level: 0 = normal, 1+ = verbose.
    verbosity: u8,
    /// Whether output is suppressed.
    quiet: bool,
}

impl Printer {
    /// Create a new printer with the given verbosity and quiet settings.
    pub fn new(verbosity: u8, quiet: bool) -> Self {
        Self { verbosity, quiet }
    }

    /// A printer that only emits errors.
    pub fn quiet() -> Self {
        Self::new(0, true)
    }

    /// Print a section header, e.g. the buildpack name at the start of a phase.
    pub fn header(&self, message: &str) {
        if !self.quiet {
            eprintln!("{}", message.bold());
        }
    }

    /// Print an informational message to stderr.
    pub fn info(&self, message: &str) {
        if !self.quiet {
            eprintln!("  {message}");
        }
    }

    /// Print a warning message to stderr.
    pub fn warn(&self, message: &str) {
        if !self.quiet {
            eprintln!("  {}: {}", "warning".yellow().bold(), message);
        }
    }

    /// Print an error message to stderr.
    pub fn error(&self, message: &str) {
        eprintln!("{}: {}", "error".red().bold(), message);
    }

    /// Print a debug message (only at verbosity >= 1).
    pub fn debug(&self, message: &str) {
        if self.verbosity >= 1 && !self.quiet {
            eprintln!("  {}: {}", "debug".dimmed(), message);
        }
    }
}
