//! Run region-parallel variant calling over a sample sheet.

use anyhow::{Context, Result};
use clap::Parser;
use fgoxide::io::DelimFile;
use itertools::Itertools;
use log::info;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use vcall_lib::combine::combine_multiple_callers;
use vcall_lib::logging::OperationTimer;
use vcall_lib::parallel::{parallel_variantcall_region, LocalDelegate};
use vcall_lib::sample::Sample;

use crate::commands::command::Command;
use crate::commands::common::SampleSheetOptions;

/// One row of the per-call summary written with `--summary`.
#[derive(Debug, Serialize)]
struct CallSummaryRow {
    sample: String,
    batch: String,
    variantcaller: String,
    vrn_file: String,
    do_upload: bool,
}

/// Call variants across samples, split by genomic region.
///
/// Reads a JSON sample sheet, expands multi-caller samples, runs per-region
/// calling through the local execution delegate, and writes the terminal
/// sample records (with their `variants` lists) back as JSON.
#[derive(Debug, Parser)]
#[command(
    name = "call",
    about = "Run region-parallel variant calling over a sample sheet",
    long_about = r#"
Run region-parallel variant calling over a sample sheet.

Each sample record names its alignment inputs, working directory, reference
sequence, and requested caller(s). Samples requesting several callers are
expanded and called independently, then recombined into a single record
whose `variants` list follows the configured caller order. Samples supplying
precalled variants (and no caller) have those staged instead of called.

Re-running after a failure skips every output that already exists, resuming
from the first missing file.

EXAMPLES:

  # Call variants for all samples in a sheet
  vcall call -i samples.json -o called.json

  # Also write a per-call TSV summary
  vcall call -i samples.json -o called.json --summary calls.tsv
"#
)]
pub struct Call {
    #[command(flatten)]
    pub io: SampleSheetOptions,

    /// Optional TSV summary of the final per-caller call sets.
    #[arg(short = 's', long = "summary")]
    pub summary: Option<PathBuf>,
}

impl Command for Call {
    fn execute(&self) -> Result<()> {
        self.io.validate()?;
        let sheet = File::open(&self.io.samples)
            .with_context(|| format!("opening sample sheet {}", self.io.samples.display()))?;
        let samples: Vec<Sample> = serde_json::from_reader(sheet)
            .with_context(|| format!("parsing sample sheet {}", self.io.samples.display()))?;
        info!("Loaded {} sample(s) from {}", samples.len(), self.io.samples.display());

        let timer = OperationTimer::new("Region-parallel variant calling");
        let called = parallel_variantcall_region(samples, &LocalDelegate)?;
        let finished = combine_multiple_callers(called)?;
        timer.log_completion(finished.len() as u64);

        for data in &finished {
            let callers = data.variants.iter().map(|v| v.variantcaller.as_str()).join(", ");
            info!("Sample '{}': callers [{callers}]", data.description);
        }

        let out = File::create(&self.io.output)
            .with_context(|| format!("creating output {}", self.io.output.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(out), &finished)
            .with_context(|| format!("writing output {}", self.io.output.display()))?;

        if let Some(summary) = &self.summary {
            let rows: Vec<CallSummaryRow> = finished
                .iter()
                .flat_map(|data| {
                    data.variants.iter().map(|call| CallSummaryRow {
                        sample: data.description.clone(),
                        batch: data.batch_key().to_string(),
                        variantcaller: call.variantcaller.clone(),
                        vrn_file: call
                            .vrn_file
                            .as_ref()
                            .map_or_else(String::new, |p| p.display().to_string()),
                        do_upload: call.do_upload,
                    })
                })
                .collect();
            DelimFile::default()
                .write_tsv(summary, rows)
                .with_context(|| format!("writing summary {}", summary.display()))?;
            info!("Wrote call summary: {}", summary.display());
        }
        Ok(())
    }
}
