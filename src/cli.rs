//! Command line interface for the `quillstream` demo binary.
//!
//! Runs one lifecycle scenario against an in-memory stream and reports the
//! events it emitted.

use clap::{Parser, ValueEnum};

/// Lifecycle scenario to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Write the chunks, then `end()` and let the stream finish.
    Graceful,
    /// `end()` followed immediately by `destroy()` while the finalizer is
    /// still deferred.
    DestroyAfterEnd,
    /// Fail the last write from the handler.
    HandlerError,
}

/// Command line arguments for the `quillstream` binary.
#[derive(Debug, Parser)]
#[command(name = "quillstream", version, about = "Run a writable stream lifecycle scenario")]
pub struct Cli {
    /// Scenario to run.
    #[arg(short, long, value_enum, default_value_t = Scenario::Graceful)]
    pub scenario: Scenario,
    /// Number of chunks written before the stream is ended.
    #[arg(short, long, default_value_t = 3)]
    pub chunks: usize,
    /// High-water mark in bytes.
    #[arg(long, default_value_t = 16 * 1024)]
    pub high_water_mark: usize,
}
