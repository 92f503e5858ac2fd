//! VCF-level utilities shared by caller adapters: well-formed empty outputs,
//! per-region output concatenation, paired-analysis detection, and variant
//! region subsetting.

use crate::errors::{Result, VcallError};
use crate::exec;
use crate::fsutil;
use crate::region::Region;
use crate::sample::Sample;
use log::info;
use noodles::bgzf;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Minimal VCF header for empty outputs.
const EMPTY_VCF_HEADER: &str = "##fileformat=VCFv4.2\n\
     #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

/// Region restriction handed to a caller invocation: either a BED file of
/// target intervals or a single interval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetRegions {
    /// BED file listing intervals
    File(PathBuf),
    /// One genomic interval
    Interval(Region),
}

/// True when the grouped analysis is a paired (tumor/normal) design: more
/// than one input with at least one tumor phenotype among the items.
#[must_use]
pub fn is_paired_analysis(align_bams: &[PathBuf], items: &[Sample]) -> bool {
    align_bams.len() > 1
        && items.iter().any(|item| item.phenotype.as_deref() == Some("tumor"))
}

/// Writes a well-formed empty VCF at `out_file`, block-gzipped when the path
/// ends in `.gz`.
///
/// # Errors
/// Returns an error when the output cannot be written.
pub fn write_empty_vcf(out_file: &Path) -> anyhow::Result<()> {
    fsutil::file_transaction(out_file, |tx_out| {
        write_vcf_lines(tx_out, EMPTY_VCF_HEADER.lines())
    })
}

/// Writes lines of VCF text to a path, bgzip-compressing for `.gz` outputs.
pub(crate) fn write_vcf_lines<'a, I>(path: &Path, lines: I) -> anyhow::Result<()>
where
    I: Iterator<Item = &'a str>,
{
    let file = File::create(path)?;
    if path.extension().is_some_and(|e| e == "gz") {
        let mut writer = bgzf::Writer::new(file);
        for line in lines {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.finish()?;
    } else {
        let mut writer = std::io::BufWriter::new(file);
        for line in lines {
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// Concatenates per-region variant files into a single output, in the given
/// region order.
///
/// Skips work when the output already exists. A single input is copied
/// (with index sidecars); multiple inputs go through external
/// `bcftools concat`.
///
/// # Errors
/// Returns an error when inputs are absent or the external concat fails.
pub fn concat_variant_files(inputs: &[PathBuf], out_file: &Path) -> anyhow::Result<PathBuf> {
    if out_file.exists() {
        return Ok(out_file.to_path_buf());
    }
    if inputs.is_empty() {
        return Err(VcallError::Precondition {
            sample: out_file.display().to_string(),
            reason: "no per-region outputs to concatenate".to_string(),
        }
        .into());
    }
    for input in inputs {
        crate::validation::validate_file_exists(input, "Per-region variant file")?;
    }
    if inputs.len() == 1 {
        fsutil::safe_makedir(out_file.parent().unwrap_or_else(|| Path::new(".")))?;
        fsutil::copy_plus(&inputs[0], out_file)?;
        return Ok(out_file.to_path_buf());
    }
    info!("Concatenating {} region outputs into {}", inputs.len(), out_file.display());
    fsutil::file_transaction(out_file, |tx_out| {
        let mut cmd = Command::new(exec::program_path("bcftools"));
        cmd.arg("concat");
        if out_file.extension().is_some_and(|e| e == "gz") {
            cmd.args(["-O", "z"]);
        }
        cmd.arg("-o").arg(tx_out).args(inputs);
        exec::run(&mut cmd, "bcftools", &format!("concatenating into {}", out_file.display()))?;
        Ok(())
    })?;
    Ok(out_file.to_path_buf())
}

/// Resolves the region restriction for one caller invocation.
///
/// With only a configured BED or only a runtime region, that restriction is
/// used directly. With both, the BED is intersected with the region into a
/// subset BED placed next to the output file; an empty intersection leaves
/// the subset file unwritten, which callers detect and short-circuit with an
/// empty output.
///
/// # Errors
/// Returns an error when the configured BED cannot be read.
pub fn subset_variant_regions(
    variant_regions: Option<&Path>,
    region: Option<&Region>,
    out_file: &Path,
) -> Result<Option<TargetRegions>> {
    match (variant_regions, region) {
        (None, None) => Ok(None),
        (None, Some(r)) => Ok(Some(TargetRegions::Interval(r.clone()))),
        (Some(bed), None) => Ok(Some(TargetRegions::File(bed.to_path_buf()))),
        (Some(bed), Some(r)) => {
            let (stem, _) = fsutil::splitext_plus(out_file);
            let subset_bed = PathBuf::from(format!("{stem}-regions.bed"));
            if subset_bed.exists() {
                return Ok(Some(TargetRegions::File(subset_bed)));
            }
            let overlapping = read_overlapping_bed_lines(bed, r)?;
            if !overlapping.is_empty() {
                write_bed_lines(&subset_bed, &overlapping)?;
            }
            Ok(Some(TargetRegions::File(subset_bed)))
        }
    }
}

fn read_overlapping_bed_lines(bed: &Path, region: &Region) -> Result<Vec<String>> {
    let file =
        File::open(bed).map_err(|e| VcallError::io(bed.display().to_string(), e))?;
    let mut overlapping = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| VcallError::io(bed.display().to_string(), e))?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let (Some(chrom), Some(start), Some(end)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let (Ok(start), Ok(end)) = (start.parse::<u64>(), end.parse::<u64>()) else {
            continue;
        };
        if region.overlaps(chrom, start, end) {
            overlapping.push(line);
        }
    }
    Ok(overlapping)
}

fn write_bed_lines(path: &Path, lines: &[String]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fsutil::safe_makedir(parent)?;
    let mut file =
        File::create(path).map_err(|e| VcallError::io(path.display().to_string(), e))?;
    for line in lines {
        writeln!(file, "{line}").map_err(|e| VcallError::io(path.display().to_string(), e))?;
    }
    Ok(())
}
