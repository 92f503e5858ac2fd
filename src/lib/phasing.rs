//! Read-backed phasing of called variants via external GATK.

use crate::exec;
use crate::fsutil;
use crate::region::Region;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Phases called variants using aligned read evidence, producing a
/// `-phased` companion of the call file. Skips work when the phased output
/// already exists.
///
/// # Errors
/// Returns an error when the external phasing invocation fails.
pub fn read_backed_phasing(
    call_file: &Path,
    align_bams: &[PathBuf],
    ref_file: &Path,
    region: Option<&Region>,
) -> anyhow::Result<PathBuf> {
    let (stem, ext) = fsutil::splitext_plus(call_file);
    let out_file = PathBuf::from(format!("{stem}-phased{ext}"));
    if out_file.exists() {
        return Ok(out_file);
    }
    fsutil::file_transaction(&out_file, |tx_out| {
        let mut cmd = Command::new(exec::program_path("gatk"));
        cmd.args(["-T", "ReadBackedPhasing"])
            .arg("-R")
            .arg(ref_file)
            .arg("-V")
            .arg(call_file)
            .arg("--out")
            .arg(tx_out);
        for bam in align_bams {
            cmd.arg("-I").arg(bam);
        }
        if let Some(region) = region {
            cmd.arg("-L").arg(region.to_tool_str());
        }
        exec::run(&mut cmd, "gatk", &format!("read-backed phasing of {}", call_file.display()))?;
        Ok(())
    })?;
    Ok(out_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_existing_phased_output_short_circuits() {
        let dir = TempDir::new().unwrap();
        let call_file = dir.path().join("calls.vcf.gz");
        let phased = dir.path().join("calls-phased.vcf.gz");
        std::fs::write(&phased, b"phased").unwrap();
        let out =
            read_backed_phasing(&call_file, &[], Path::new("ref.fa"), None).unwrap();
        assert_eq!(out, phased);
    }
}
