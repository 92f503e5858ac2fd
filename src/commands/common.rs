//! Common CLI options shared across commands.
//!
//! Shared argument structures composed into command structs with
//! `#[command(flatten)]`.

use std::path::PathBuf;

use clap::Args;

use vcall_lib::validation::validate_file_exists;

/// Input/output options for commands that read and write sample sheets.
#[derive(Debug, Clone, Args)]
pub struct SampleSheetOptions {
    /// Input sample sheet (JSON)
    #[arg(short = 'i', long = "samples")]
    pub samples: PathBuf,

    /// Output sample sheet with calling results (JSON)
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

impl SampleSheetOptions {
    /// Validates that the input sample sheet exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the input file does not exist.
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_file_exists(&self.samples, "Sample sheet")?;
        Ok(())
    }
}
