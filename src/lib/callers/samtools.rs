//! Variant calling with samtools mpileup and bcftools call.
//!
//! Composes the two external tools as a pipeline, patching the call
//! output stream for VCF header compatibility with downstream consumers and
//! block-gzipping `.gz` outputs. Output production is transactional and
//! idempotent: an existing output is never recomputed.

use crate::annotation;
use crate::errors::VcallError;
use crate::exec;
use crate::fsutil;
use crate::region::Region;
use crate::sample::Sample;
use crate::vcfutils::{self, TargetRegions};
use anyhow::Context;
use log::{debug, info};
use noodles::bgzf;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Oldest samtools release with the mpileup/call interface this adapter
/// drives. Anything at or below it is rejected.
const MIN_SAMTOOLS_VERSION: &str = "0.1.19";

const MAX_READ_DEPTH: u32 = 1000;

/// Signature of the region-restricted calling step an adapter composes with
/// the shared prep/indexing scaffolding.
type CallFn = fn(
    align_bams: &[PathBuf],
    ref_file: &Path,
    items: &[Sample],
    target_regions: Option<&TargetRegions>,
    tx_out_file: &Path,
) -> anyhow::Result<()>;

/// Detects SNPs and indels with samtools mpileup and bcftools call.
///
/// The caller-registry entry for `samtools`; see the registry's `CallerFn`
/// contract for argument semantics.
///
/// # Errors
/// Fails on an unsupported samtools version, a failed pipeline invocation,
/// or a failed annotation step.
pub fn run_samtools(
    align_bams: &[PathBuf],
    items: &[Sample],
    ref_file: &Path,
    assoc_files: &BTreeMap<String, PathBuf>,
    region: Option<&Region>,
    out_file: Option<&Path>,
) -> anyhow::Result<PathBuf> {
    shared_variantcall(
        call_variants_samtools,
        "samtools",
        align_bams,
        ref_file,
        items,
        assoc_files,
        region,
        out_file,
    )
}

/// Shared prep and indexing scaffolding for pileup-style callers: default
/// output resolution, idempotent skip, region subsetting with the
/// empty-output short-circuit, transactional calling, and annotation.
#[allow(clippy::too_many_arguments)]
pub(crate) fn shared_variantcall(
    call_fn: CallFn,
    name: &str,
    align_bams: &[PathBuf],
    ref_file: &Path,
    items: &[Sample],
    assoc_files: &BTreeMap<String, PathBuf>,
    region: Option<&Region>,
    out_file: Option<&Path>,
) -> anyhow::Result<PathBuf> {
    let item = items.first().ok_or_else(|| VcallError::Precondition {
        sample: name.to_string(),
        reason: "no sample records supplied to caller".to_string(),
    })?;
    let out_file = match out_file {
        Some(path) => path.to_path_buf(),
        None => default_out_file(align_bams, items)?,
    };
    if !out_file.exists() {
        debug!(
            "Genotyping with {name}: {} {}",
            region.map_or_else(|| "whole-genome".to_string(), Region::to_string),
            align_bams
                .first()
                .and_then(|bam| bam.file_name())
                .map_or_else(String::new, |f| f.to_string_lossy().to_string())
        );
        for bam in align_bams {
            exec::index_bam(bam)?;
        }
        let variant_regions = item.config.variant_regions.as_deref();
        let target = vcfutils::subset_variant_regions(variant_regions, region, &out_file)?;
        let unusable_subset = variant_regions.is_some()
            && matches!(&target, Some(TargetRegions::File(path)) if !path.is_file());
        if unusable_subset {
            vcfutils::write_empty_vcf(&out_file)?;
        } else {
            fsutil::file_transaction(&out_file, |tx_out| {
                call_fn(align_bams, ref_file, items, target.as_ref(), tx_out)
            })?;
        }
    }
    let dbsnp = assoc_files.get("dbsnp").map(PathBuf::as_path);
    annotation::annotate_nongatk_vcf(&out_file, dbsnp, None)
}

/// Resolves the default output path: batch-named for paired analyses,
/// BAM-named for single samples.
fn default_out_file(align_bams: &[PathBuf], items: &[Sample]) -> anyhow::Result<PathBuf> {
    let item = &items[0];
    if vcfutils::is_paired_analysis(align_bams, items) {
        Ok(item
            .dirs
            .work
            .join(format!("{}-paired-variants.vcf.gz", item.batch_key())))
    } else {
        let bam = align_bams.first().ok_or_else(|| VcallError::Precondition {
            sample: item.description.clone(),
            reason: "no alignment inputs supplied to caller".to_string(),
        })?;
        let (stem, _) = fsutil::splitext_plus(bam);
        Ok(PathBuf::from(format!("{stem}-variants.vcf.gz")))
    }
}

/// Builds the samtools mpileup command for the given inputs and optional
/// region restriction.
#[must_use]
pub fn prep_mpileup(
    align_bams: &[PathBuf],
    ref_file: &Path,
    max_read_depth: u32,
    target_regions: Option<&TargetRegions>,
    want_bcf: bool,
) -> Command {
    let mut cmd = Command::new(exec::program_path("samtools"));
    cmd.arg("mpileup")
        .arg("-f")
        .arg(ref_file)
        .args(["-d", &max_read_depth.to_string()])
        .args(["-L", &max_read_depth.to_string()])
        .args(["-m", "3"])
        .args(["-F", "0.0002"]);
    if want_bcf {
        cmd.args(["-t", "DP", "-t", "SP", "-u", "-g"]);
    }
    match target_regions {
        Some(TargetRegions::File(path)) => {
            cmd.arg("-l").arg(path);
        }
        Some(TargetRegions::Interval(region)) => {
            cmd.args(["-r", &region.to_tool_str()]);
        }
        None => {}
    }
    for bam in align_bams {
        cmd.arg(bam);
    }
    cmd
}

/// Calls variants with samtools in the target regions, streaming the
/// mpileup output through bcftools call and patching header lines for
/// downstream compatibility.
fn call_variants_samtools(
    align_bams: &[PathBuf],
    ref_file: &Path,
    items: &[Sample],
    target_regions: Option<&TargetRegions>,
    tx_out_file: &Path,
) -> anyhow::Result<()> {
    let item = &items[0];
    let samtools_version = exec::program_version("samtools")?;
    let minimum = exec::ToolVersion::from_parts(&[0, 1, 19]);
    if samtools_version <= minimum {
        return Err(VcallError::UnsupportedToolVersion {
            tool: "samtools".to_string(),
            found: samtools_version.as_str().to_string(),
            minimum: MIN_SAMTOOLS_VERSION.to_string(),
        }
        .into());
    }
    let context = format!(
        "variant calling with samtools: sample '{}', output {}",
        item.description,
        tx_out_file.display()
    );
    info!("{context}");
    let mut mpileup_cmd =
        prep_mpileup(align_bams, ref_file, MAX_READ_DEPTH, target_regions, true);
    let mut mpileup = mpileup_cmd
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning samtools mpileup for {}", item.description))?;
    let mpileup_out = mpileup.stdout.take().ok_or_else(|| {
        VcallError::ToolFailed {
            tool: "samtools".to_string(),
            context: context.clone(),
            detail: "no stdout from mpileup".to_string(),
        }
    })?;
    let mut call = Command::new(exec::program_path("bcftools"))
        .args(["call", "-v", "-m", "-"])
        .stdin(Stdio::from(mpileup_out))
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning bcftools call for {}", item.description))?;
    let call_out = call.stdout.take().ok_or_else(|| VcallError::ToolFailed {
        tool: "bcftools".to_string(),
        context: context.clone(),
        detail: "no stdout from call".to_string(),
    })?;
    write_patched_stream(call_out, tx_out_file)?;
    for (tool, child) in [("samtools", &mut mpileup), ("bcftools", &mut call)] {
        let status = child.wait().map_err(|e| VcallError::ToolFailed {
            tool: tool.to_string(),
            context: context.clone(),
            detail: e.to_string(),
        })?;
        if !status.success() {
            return Err(VcallError::ToolFailed {
                tool: tool.to_string(),
                context: context.clone(),
                detail: format!("exit status {status}"),
            }
            .into());
        }
    }
    Ok(())
}

/// Streams call output to disk, rewriting header formats older consumers
/// reject and block-gzipping `.gz` outputs.
fn write_patched_stream(
    stream: impl std::io::Read,
    tx_out_file: &Path,
) -> anyhow::Result<()> {
    let reader = BufReader::new(stream);
    let file = File::create(tx_out_file)?;
    if tx_out_file.extension().is_some_and(|e| e == "gz") {
        let mut writer = bgzf::Writer::new(file);
        copy_patched_lines(reader, &mut writer)?;
        writer.finish()?;
    } else {
        let mut writer = std::io::BufWriter::new(file);
        copy_patched_lines(reader, &mut writer)?;
    }
    Ok(())
}

fn copy_patched_lines(
    reader: impl BufRead,
    writer: &mut impl Write,
) -> anyhow::Result<()> {
    for line in reader.lines() {
        let line = patch_vcf_line(&line?);
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Rewrites VCF 4.2-only header constructs emitted by samtools for
/// compatibility with downstream consumers.
fn patch_vcf_line(line: &str) -> String {
    line.replace(",Version=3>", ">").replace("Number=R", "Number=.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_line(cmd: &Command) -> String {
        format!("{cmd:?}")
    }

    #[test]
    fn test_prep_mpileup_base_options() {
        let bams = vec![PathBuf::from("a.bam"), PathBuf::from("b.bam")];
        let cmd = prep_mpileup(&bams, Path::new("ref.fa"), 1000, None, true);
        let line = command_line(&cmd);
        assert!(line.contains("mpileup"));
        assert!(line.contains("\"-d\" \"1000\""));
        assert!(line.contains("\"-g\""), "BCF output requested");
        assert!(line.contains("a.bam") && line.contains("b.bam"));
    }

    #[test]
    fn test_prep_mpileup_without_bcf() {
        let bams = vec![PathBuf::from("a.bam")];
        let cmd = prep_mpileup(&bams, Path::new("ref.fa"), 1000, None, false);
        assert!(!command_line(&cmd).contains("\"-g\""));
    }

    #[test]
    fn test_prep_mpileup_interval_restriction() {
        let bams = vec![PathBuf::from("a.bam")];
        let target = TargetRegions::Interval(Region::new("chr1", 0, 100));
        let cmd = prep_mpileup(&bams, Path::new("ref.fa"), 1000, Some(&target), true);
        assert!(command_line(&cmd).contains("\"chr1:1-100\""));
    }

    #[test]
    fn test_prep_mpileup_bed_restriction() {
        let bams = vec![PathBuf::from("a.bam")];
        let target = TargetRegions::File(PathBuf::from("targets.bed"));
        let cmd = prep_mpileup(&bams, Path::new("ref.fa"), 1000, Some(&target), true);
        let line = command_line(&cmd);
        assert!(line.contains("\"-l\""));
        assert!(line.contains("targets.bed"));
    }

    #[test]
    fn test_patch_vcf_line() {
        assert_eq!(
            patch_vcf_line("##FORMAT=<ID=PL,Number=G,Version=3>"),
            "##FORMAT=<ID=PL,Number=G>"
        );
        assert_eq!(
            patch_vcf_line("##INFO=<ID=AD,Number=R,Type=Integer>"),
            "##INFO=<ID=AD,Number=.,Type=Integer>"
        );
        assert_eq!(patch_vcf_line("chr1\t100\t.\tA\tT"), "chr1\t100\t.\tA\tT");
    }

    #[test]
    fn test_default_out_file_single_sample() {
        let sample = Sample::new("S1", "/work");
        let bams = vec![PathBuf::from("/data/S1-sorted.bam")];
        let out = default_out_file(&bams, &[sample]).unwrap();
        assert_eq!(out, PathBuf::from("/data/S1-sorted-variants.vcf.gz"));
    }

    #[test]
    fn test_default_out_file_paired_analysis() {
        let mut tumor = Sample::new("T1", "/work");
        tumor.batch = Some("B1".to_string());
        tumor.phenotype = Some("tumor".to_string());
        let mut normal = Sample::new("N1", "/work");
        normal.batch = Some("B1".to_string());
        normal.phenotype = Some("normal".to_string());
        let bams = vec![PathBuf::from("t.bam"), PathBuf::from("n.bam")];
        let out = default_out_file(&bams, &[tumor, normal]).unwrap();
        assert_eq!(out, PathBuf::from("/work/B1-paired-variants.vcf.gz"));
    }

    #[test]
    fn test_patched_stream_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("calls.vcf");
        let input = "##FORMAT=<ID=PL,Number=G,Version=3>\nchr1\t1\t.\tA\tT\n";
        write_patched_stream(input.as_bytes(), &out).unwrap();
        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text, "##FORMAT=<ID=PL,Number=G>\nchr1\t1\t.\tA\tT\n");
    }
}
