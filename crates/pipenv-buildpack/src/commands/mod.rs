//! The two buildpack phases.
//!
//! Each phase resolves its inputs from the libcnb context, runs, and hands a
//! result back to libcnb, which reports it to the lifecycle.

pub mod build;
pub mod detect;
