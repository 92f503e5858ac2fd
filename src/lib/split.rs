//! Region splitting: turning a region-assigned sample into independent work
//! units.
//!
//! Each work unit names one region, the alignment inputs resolved for that
//! region, and an output path namespaced by sample and region so units can
//! run concurrently without collisions. Samples without assigned regions are
//! not split; caller-level code runs once on the whole input.

use crate::errors::{Result, VcallError};
use crate::region::Region;
use crate::sample::Sample;
use std::path::{Path, PathBuf};

/// One (region, inputs, output) tuple submitted for independent execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkUnit {
    /// Region this unit covers
    pub region: Region,
    /// Alignment inputs resolved for the region
    pub bams: Vec<PathBuf>,
    /// Per-region output path
    pub out_file: PathBuf,
}

/// The split decision for one sample: the eventual combined output (absent
/// when the sample is not split) and the per-region work units.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitPlan {
    /// Combined output path for the whole sample; `None` when unsplit
    pub out_file: Option<PathBuf>,
    /// Independent per-region work units
    pub parts: Vec<WorkUnit>,
}

/// Builds a split function that organizes work by the sample's assigned
/// regions.
///
/// Outputs land under `<work>/<dir_ext_fn(sample)>/`: the combined file as
/// `<name><ext>` and each region's file as
/// `<region-name>/<name>-<region-safe-string><ext>`.
///
/// The returned function yields an empty plan for samples with no `region`
/// assignment. Region inputs are resolved from the sample's `region_bams`
/// entries: a singular entry serves every region, a parallel entry is
/// indexed by region. Every resolved path must exist; an absent file is a
/// fatal precondition violation.
pub fn split_by_ready_regions<F>(
    ext: &str,
    dir_ext_fn: F,
) -> impl Fn(&Sample) -> Result<SplitPlan>
where
    F: Fn(&Sample) -> String,
{
    let ext = ext.to_string();
    move |data: &Sample| {
        let Some(regions) = &data.region else {
            return Ok(SplitPlan::default());
        };
        let name = data.split_name();
        let out_dir = data.dirs.work.join(dir_ext_fn(data));
        let out_file = out_dir.join(format!("{name}{ext}"));
        let mut parts = Vec::with_capacity(regions.len());
        for (i, region) in regions.iter().enumerate() {
            let out_region_file = out_dir
                .join(&region.name)
                .join(format!("{name}-{}{ext}", region.to_safe_str()));
            let bams = resolve_region_bams(data, i)?;
            for bam in &bams {
                ensure_exists(bam, data)?;
            }
            parts.push(WorkUnit { region: region.clone(), bams, out_file: out_region_file });
        }
        Ok(SplitPlan { out_file: Some(out_file), parts })
    }
}

/// Picks the alignment input for region `i` from each `region_bams` entry:
/// the sole element of a singular entry, otherwise element `i`.
fn resolve_region_bams(data: &Sample, i: usize) -> Result<Vec<PathBuf>> {
    let Some(region_bams) = &data.region_bams else {
        return Err(VcallError::Precondition {
            sample: data.description.clone(),
            reason: "sample has regions but no region_bams".to_string(),
        });
    };
    let mut bams = Vec::with_capacity(region_bams.len());
    for entry in region_bams {
        let bam = if entry.len() == 1 {
            &entry[0]
        } else {
            entry.get(i).ok_or_else(|| VcallError::Precondition {
                sample: data.description.clone(),
                reason: format!(
                    "region_bams entry has {} paths but region index {i} was requested",
                    entry.len()
                ),
            })?
        };
        bams.push(bam.clone());
    }
    Ok(bams)
}

fn ensure_exists(bam: &Path, data: &Sample) -> Result<()> {
    if !bam.exists() {
        return Err(VcallError::MissingFile {
            path: bam.display().to_string(),
            context: format!("Region input BAM for sample '{}'", data.description),
        });
    }
    Ok(())
}
