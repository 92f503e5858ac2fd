//! Region-parallel orchestration of variant calling.
//!
//! The orchestration itself is synchronous and stateless: it expands
//! samples per caller, derives a split plan per sample, and hands the work
//! to an [`ExecutionDelegate`]. The delegate owns actual execution — worker
//! processes, threads, or a cluster — and only promises that all work units
//! for a sample finish before that sample's combine step runs, that the
//! combine step sees every per-region output, and that returned records
//! keep their batch/BAM/caller identity for regrouping.

use crate::collapse::collapse_by_bam_variantcaller;
use crate::expand::{get_variantcaller, handle_multiple_callers, CallerKey};
use crate::precalled::handle_precalled;
use crate::registry::variantcall_sample;
use crate::sample::{Sample, VrnFile};
use crate::split::{split_by_ready_regions, SplitPlan};
use crate::vcfutils;
use indexmap::IndexMap;
use log::info;

/// Caller used when a sample requests calling without naming a caller.
pub const DEFAULT_CALLER: &str = "gatk";

/// A split function: derives the work units and combined output for one
/// sample.
pub type SplitFn<'a> = dyn Fn(&Sample) -> crate::errors::Result<SplitPlan> + 'a;

/// A grouping function: partitions samples into sets that must execute
/// together (e.g. batch members for joint processing).
pub type GroupFn<'a> = dyn Fn(Vec<Sample>) -> Vec<Vec<Sample>> + 'a;

/// Task names for one split/combine round, used in logs and progress
/// reporting.
#[derive(Clone, Copy, Debug)]
pub struct ParallelSpec<'a> {
    /// Name of the per-unit task
    pub task_name: &'a str,
    /// Name of the per-sample combine task
    pub combine_task_name: &'a str,
}

/// External executor of split work.
///
/// Implementations decide where and how work units run; the orchestration
/// treats them as a black box with the guarantees documented on this
/// module.
pub trait ExecutionDelegate {
    /// Runs every sample's work units and combine step, returning the
    /// samples with their combined outputs recorded.
    ///
    /// # Errors
    /// Propagates failures from the per-unit task or the combine step.
    fn grouped_split_combine(
        &self,
        samples: Vec<Sample>,
        split_fn: &SplitFn<'_>,
        group_fn: &GroupFn<'_>,
        spec: &ParallelSpec<'_>,
    ) -> anyhow::Result<Vec<Sample>>;
}

/// In-process serial delegate: runs work units one after another on the
/// current thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalDelegate;

impl ExecutionDelegate for LocalDelegate {
    fn grouped_split_combine(
        &self,
        samples: Vec<Sample>,
        split_fn: &SplitFn<'_>,
        group_fn: &GroupFn<'_>,
        spec: &ParallelSpec<'_>,
    ) -> anyhow::Result<Vec<Sample>> {
        let mut out = Vec::with_capacity(samples.len());
        for group in group_fn(samples) {
            for mut data in group {
                let plan = split_fn(&data)?;
                match plan.out_file {
                    None => {
                        // Unsplit: run the task once against the whole input.
                        info!("{}: sample '{}' (unsplit)", spec.task_name, data.description);
                        let bams = data
                            .align_bam
                            .as_ref()
                            .map(|inputs| inputs.paths().to_vec())
                            .unwrap_or_default();
                        variantcall_sample(&mut data, None, &bams, None)?;
                    }
                    Some(out_file) => {
                        let mut part_outputs = Vec::with_capacity(plan.parts.len());
                        for unit in &plan.parts {
                            info!(
                                "{}: sample '{}' region {}",
                                spec.task_name, data.description, unit.region
                            );
                            let mut part = data.clone();
                            variantcall_sample(
                                &mut part,
                                Some(&unit.region),
                                &unit.bams,
                                Some(&unit.out_file),
                            )?;
                            part_outputs.push(unit.out_file.clone());
                        }
                        info!(
                            "{}: sample '{}' ({} regions)",
                            spec.combine_task_name,
                            data.description,
                            part_outputs.len()
                        );
                        vcfutils::concat_variant_files(&part_outputs, &out_file)?;
                        data.vrn_file = Some(VrnFile::One(out_file));
                    }
                }
                out.push(data);
            }
        }
        Ok(out)
    }
}

/// Groups samples that must execute together: members of one batch running
/// the same caller form a group; everything else runs alone. Group order
/// follows first encounter.
#[must_use]
pub fn group_batches(samples: Vec<Sample>) -> Vec<Vec<Sample>> {
    let mut grouped: IndexMap<(Option<String>, Option<String>), Vec<Sample>> = IndexMap::new();
    let mut singles = Vec::new();
    for data in samples {
        match data.batch.clone() {
            Some(batch) => {
                let caller = get_variantcaller(&data, CallerKey::Variant, Some(DEFAULT_CALLER))
                    .and_then(|selection| selection.as_scalar().map(String::from));
                grouped.entry((Some(batch), caller)).or_default().push(data);
            }
            None => singles.push(vec![data]),
        }
    }
    let mut out: Vec<Vec<Sample>> = grouped.into_values().collect();
    out.extend(singles);
    out
}

/// Performs variant calling on samples split by genomic region.
///
/// Samples requesting multiple callers are expanded to one record per
/// caller before splitting; samples requesting no calling take the
/// precalled path instead. After the delegate finishes, per-region records
/// collapse back to one record per (batch, BAM, caller).
///
/// # Errors
/// Propagates configuration errors, precondition violations, and execution
/// failures.
pub fn parallel_variantcall_region(
    samples: Vec<Sample>,
    delegate: &dyn ExecutionDelegate,
) -> anyhow::Result<Vec<Sample>> {
    let mut to_process = Vec::new();
    let mut extras = Vec::new();
    for data in samples {
        let added = handle_multiple_callers(&data, CallerKey::Variant, Some(DEFAULT_CALLER));
        if added.is_empty() {
            extras.push(handle_precalled(data)?);
        } else {
            to_process.extend(added);
        }
    }
    let split_fn = split_by_ready_regions(".vcf.gz", |data: &Sample| {
        get_variantcaller(data, CallerKey::Variant, Some(DEFAULT_CALLER))
            .and_then(|selection| selection.as_scalar().map(String::from))
            .unwrap_or_else(|| DEFAULT_CALLER.to_string())
    });
    let spec = ParallelSpec {
        task_name: "variantcall_sample",
        combine_task_name: "concat_variant_files",
    };
    let called =
        delegate.grouped_split_combine(to_process, &split_fn, &group_batches, &spec)?;
    let mut out = extras;
    out.extend(collapse_by_bam_variantcaller(called));
    Ok(out)
}
