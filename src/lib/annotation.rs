//! Post-call annotation against known-variant resources.

use crate::exec;
use crate::fsutil;
use log::info;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Annotates a freshly called VCF with identifiers from a known-variants
/// resource (e.g. dbSNP), producing an `-annotated` companion file. Without
/// a resource the call file passes through untouched. Skips work when the
/// annotated output already exists.
///
/// # Errors
/// Returns an error when the external annotation invocation fails.
pub fn annotate_nongatk_vcf(
    call_file: &Path,
    dbsnp: Option<&Path>,
    out_prefix: Option<&Path>,
) -> anyhow::Result<PathBuf> {
    let Some(dbsnp) = dbsnp else {
        return Ok(call_file.to_path_buf());
    };
    let base = out_prefix.unwrap_or(call_file);
    let (stem, ext) = fsutil::splitext_plus(base);
    let out_file = PathBuf::from(format!("{stem}-annotated{ext}"));
    if out_file.exists() {
        return Ok(out_file);
    }
    info!("Annotating {} with {}", call_file.display(), dbsnp.display());
    fsutil::file_transaction(&out_file, |tx_out| {
        let mut cmd = Command::new(exec::program_path("bcftools"));
        cmd.arg("annotate")
            .arg("-a")
            .arg(dbsnp)
            .args(["-c", "ID"]);
        if out_file.extension().is_some_and(|e| e == "gz") {
            cmd.args(["-O", "z"]);
        }
        cmd.arg("-o").arg(tx_out).arg(call_file);
        exec::run(
            &mut cmd,
            "bcftools",
            &format!("annotating {}", call_file.display()),
        )?;
        Ok(())
    })?;
    Ok(out_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_no_resource_passes_through() {
        let call_file = Path::new("/work/calls.vcf.gz");
        let out = annotate_nongatk_vcf(call_file, None, None).unwrap();
        assert_eq!(out, call_file);
    }

    #[test]
    fn test_existing_annotated_output_short_circuits() {
        let dir = TempDir::new().unwrap();
        let call_file = dir.path().join("calls.vcf.gz");
        let annotated = dir.path().join("calls-annotated.vcf.gz");
        std::fs::write(&annotated, b"annotated").unwrap();
        let out = annotate_nongatk_vcf(&call_file, Some(Path::new("dbsnp.vcf.gz")), None)
            .unwrap();
        assert_eq!(out, annotated);
    }
}
