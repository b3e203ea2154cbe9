//! Command-line interface for skysentry.
//!
//! The watchdog has no command surface: the binary constructs the
//! components and runs the two loops. The only flags are the config path
//! and verbosity.

use std::path::PathBuf;

use clap::Parser;

/// skysentryd - drone-side jamming watchdog
///
/// Monitors the radio environment for hostile interference while backing up
/// encrypted sensor captures; on detection, erases the backup store and
/// triggers return-to-home, exactly once.
#[derive(Debug, Parser)]
#[command(name = "skysentryd")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
