//! Library surface for the `navnet-sim` binary.
//!
//! Config parsing and the experiment service live here so integration tests
//! can drive them without going through the CLI.

pub mod config;
pub mod progress;
pub mod service;
