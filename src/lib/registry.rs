//! Caller registry and the per-region calling entry point.
//!
//! Caller identifiers form a closed, enumerated domain: a name outside
//! [`CallerId`] is a rejected configuration, and a recognized name without a
//! built-in adapter reports that explicitly instead of silently doing
//! nothing. The registry is a lookup table from identifier to caller
//! function, built once at startup.

use crate::callers;
use crate::errors::{Result, VcallError};
use crate::exec;
use crate::expand::{get_variantcaller, CallerKey};
use crate::fsutil;
use crate::parallel::DEFAULT_CALLER;
use crate::phasing;
use crate::region::Region;
use crate::sample::{Sample, VrnFile};
use ahash::HashMap;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Recognized variant caller identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallerId {
    Gatk,
    GatkHaplotype,
    Mutect2,
    Freebayes,
    Samtools,
    Varscan,
    Platypus,
    Vardict,
}

impl CallerId {
    /// All recognized identifiers, in display order.
    pub const ALL: [CallerId; 8] = [
        CallerId::Gatk,
        CallerId::GatkHaplotype,
        CallerId::Mutect2,
        CallerId::Freebayes,
        CallerId::Samtools,
        CallerId::Varscan,
        CallerId::Platypus,
        CallerId::Vardict,
    ];

    /// The configuration name for this caller.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            CallerId::Gatk => "gatk",
            CallerId::GatkHaplotype => "gatk-haplotype",
            CallerId::Mutect2 => "mutect2",
            CallerId::Freebayes => "freebayes",
            CallerId::Samtools => "samtools",
            CallerId::Varscan => "varscan",
            CallerId::Platypus => "platypus",
            CallerId::Vardict => "vardict",
        }
    }

    /// Resolves a configuration name to an identifier.
    ///
    /// # Errors
    /// Returns [`VcallError::UnknownCaller`] for names outside the domain.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .find(|id| id.name() == name)
            .copied()
            .ok_or_else(|| VcallError::UnknownCaller { name: name.to_string() })
    }
}

/// A caller implementation: produces variant calls for the given inputs and
/// returns the output path. Must be idempotent on output existence.
pub type CallerFn = fn(
    align_bams: &[PathBuf],
    items: &[Sample],
    ref_file: &Path,
    assoc_files: &BTreeMap<String, PathBuf>,
    region: Option<&Region>,
    out_file: Option<&Path>,
) -> anyhow::Result<PathBuf>;

static REGISTRY: LazyLock<HashMap<CallerId, CallerFn>> = LazyLock::new(|| {
    let mut table: HashMap<CallerId, CallerFn> = HashMap::default();
    table.insert(CallerId::Samtools, callers::samtools::run_samtools as CallerFn);
    table
});

/// Looks up the built-in implementation for a caller name.
///
/// # Errors
/// Returns an error for names outside the recognized domain, or recognized
/// callers with no built-in adapter.
pub fn caller_fn(name: &str) -> Result<CallerFn> {
    let id = CallerId::from_name(name)?;
    REGISTRY
        .get(&id)
        .copied()
        .ok_or_else(|| VcallError::CallerNotBuilt { name: name.to_string() })
}

/// True when a built-in adapter exists for the identifier.
#[must_use]
pub fn is_built_in(id: CallerId) -> bool {
    REGISTRY.contains_key(&id)
}

/// Runs genotyping of one region of one sample.
///
/// The parallel entry point executed per work unit. Skips work when
/// `out_file` already exists; otherwise resolves the configured caller from
/// the registry, invokes it against a `-raw` intermediate path, applies
/// read-backed phasing when configured, and publishes the result at
/// `out_file`. Without an explicit `out_file` (unsplit samples) the caller's
/// default output path convention applies and the produced path is recorded
/// directly.
///
/// # Errors
/// Returns configuration errors for unknown/unbuilt callers and propagates
/// caller failures with sample and region context.
pub fn variantcall_sample(
    data: &mut Sample,
    region: Option<&Region>,
    align_bams: &[PathBuf],
    out_file: Option<&Path>,
) -> anyhow::Result<()> {
    let exists = out_file.is_some_and(Path::exists);
    if !exists {
        let caller_name = get_variantcaller(data, CallerKey::Variant, Some(DEFAULT_CALLER))
            .and_then(|selection| selection.as_scalar().map(String::from))
            .ok_or_else(|| VcallError::InvalidConfig {
                sample: data.description.clone(),
                reason: "no concrete variantcaller configured for calling".to_string(),
            })?;
        let caller = caller_fn(&caller_name)?;
        let items = calling_items(data, align_bams)?;
        let raw_file = out_file.map(|out| {
            fsutil::safe_makedir(out.parent().unwrap_or_else(|| Path::new("."))).map(|_| {
                let (stem, ext) = fsutil::splitext_plus(out);
                PathBuf::from(format!("{stem}-raw{ext}"))
            })
        });
        let raw_file = raw_file.transpose()?;
        for bam in align_bams {
            exec::index_bam(bam)?;
        }
        let call_file = caller(
            align_bams,
            &items,
            &data.sam_ref,
            &data.assoc_files,
            region,
            raw_file.as_deref(),
        )
        .map_err(|e| {
            e.context(format!(
                "variant calling failed: sample '{}', caller '{}', region {}",
                data.description,
                caller_name,
                region.map_or_else(|| "whole-genome".to_string(), Region::to_string)
            ))
        })?;
        let call_file = if data.config.phasing.as_deref() == Some("gatk") {
            phasing::read_backed_phasing(&call_file, align_bams, &data.sam_ref, region)?
        } else {
            call_file
        };
        match out_file {
            Some(out) => {
                fsutil::symlink_plus(&call_file, out)?;
                data.vrn_file = Some(VrnFile::One(out.to_path_buf()));
            }
            None => data.vrn_file = Some(VrnFile::One(call_file)),
        }
    } else if let Some(out) = out_file {
        data.vrn_file = Some(VrnFile::One(out.to_path_buf()));
    }
    if let Some(region) = region {
        data.region = Some(vec![region.clone()]);
    }
    Ok(())
}

/// The sample records participating in one calling invocation: the record
/// itself, or the original grouped records for batched multi-BAM analyses.
fn calling_items(data: &Sample, align_bams: &[PathBuf]) -> Result<Vec<Sample>> {
    if align_bams.len() <= 1 {
        return Ok(vec![data.clone()]);
    }
    let items = data.group_orig.clone().unwrap_or_else(|| vec![data.clone()]);
    if items.len() != align_bams.len() {
        return Err(VcallError::Precondition {
            sample: data.description.clone(),
            reason: format!(
                "{} grouped records for {} alignment inputs",
                items.len(),
                align_bams.len()
            ),
        });
    }
    Ok(items)
}
