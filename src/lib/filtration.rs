//! Post-calling variant filtration.
//!
//! Filtration is strategy-selected by caller identifier. Sex-linked region
//! normalization runs first for every caller; after that, callers with a
//! dedicated filtration routine are routed to it and every other caller
//! passes through unchanged, since those tools filter as part of calling.

use crate::errors::VcallError;
use crate::exec;
use crate::expand::{get_variantcaller, CallerKey};
use crate::fsutil;
use crate::parallel::DEFAULT_CALLER;
use crate::sample::Sample;
use crate::vcfutils;
use log::info;
use noodles::bgzf;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Y-chromosome names excluded for female samples.
const Y_CHROMS: [&str; 2] = ["Y", "chrY"];

/// Filters variant calls for a sample, dispatching on the configured
/// caller.
///
/// Total over the caller-name domain: callers without a dedicated routine
/// (including unknown names) return the input unchanged.
///
/// # Errors
/// Returns an error when a filtration step fails.
pub fn variant_filtration(
    call_file: &Path,
    _ref_file: &Path,
    _vrn_files: &BTreeMap<String, PathBuf>,
    data: &Sample,
) -> anyhow::Result<PathBuf> {
    let call_file = filter_vcf_by_sex(call_file, data)?;
    let caller = get_variantcaller(data, CallerKey::Variant, Some(DEFAULT_CALLER))
        .and_then(|selection| selection.as_scalar().map(String::from));
    match caller.as_deref() {
        Some("samtools") => filter_samtools(&call_file, data),
        // Remaining callers filter as part of the call process.
        _ => Ok(call_file),
    }
}

/// Removes Y-chromosome calls for female samples, producing a `-ploidyfix`
/// companion file. Samples without a female sex annotation pass through.
///
/// # Errors
/// Returns an error when the call file cannot be read or rewritten.
pub fn filter_vcf_by_sex(call_file: &Path, data: &Sample) -> anyhow::Result<PathBuf> {
    if data.sex.as_deref().map(str::to_lowercase).as_deref() != Some("female") {
        return Ok(call_file.to_path_buf());
    }
    let (stem, ext) = fsutil::splitext_plus(call_file);
    let out_file = PathBuf::from(format!("{stem}-ploidyfix{ext}"));
    if out_file.exists() {
        return Ok(out_file);
    }
    info!(
        "Removing Y chromosome calls for female sample '{}'",
        data.description
    );
    let lines = read_vcf_lines(call_file)?;
    let kept: Vec<&str> = lines
        .iter()
        .map(String::as_str)
        .filter(|line| {
            line.starts_with('#')
                || !Y_CHROMS.contains(&line.split('\t').next().unwrap_or(""))
        })
        .collect();
    fsutil::file_transaction(&out_file, |tx_out| {
        vcfutils::write_vcf_lines(tx_out, kept.iter().copied())
    })?;
    Ok(out_file)
}

/// Soft-filters low-confidence samtools calls via external bcftools,
/// producing a `-filter` companion file.
fn filter_samtools(call_file: &Path, data: &Sample) -> anyhow::Result<PathBuf> {
    let (stem, ext) = fsutil::splitext_plus(call_file);
    let out_file = PathBuf::from(format!("{stem}-filter{ext}"));
    if out_file.exists() {
        return Ok(out_file);
    }
    fsutil::file_transaction(&out_file, |tx_out| {
        let mut cmd = Command::new(exec::program_path("bcftools"));
        cmd.arg("filter")
            .args(["-e", "QUAL<20 || DP<4", "-s", "lowQual", "-m", "+"]);
        if out_file.extension().is_some_and(|e| e == "gz") {
            cmd.args(["-O", "z"]);
        }
        cmd.arg("-o").arg(tx_out).arg(call_file);
        exec::run(
            &mut cmd,
            "bcftools",
            &format!("filtering samtools calls for sample '{}'", data.description),
        )?;
        Ok(())
    })?;
    Ok(out_file)
}

fn read_vcf_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    let file = File::open(path).map_err(|e| VcallError::io(path.display().to_string(), e))?;
    let lines = if path.extension().is_some_and(|e| e == "gz") {
        BufReader::new(bgzf::Reader::new(file))
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
    } else {
        BufReader::new(file).lines().collect::<std::io::Result<Vec<_>>>()
    };
    lines.map_err(|e| VcallError::io(path.display().to_string(), e).into())
}
