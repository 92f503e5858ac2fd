//! Combining finished calls from multiple callers into one record per
//! sample.
//!
//! The inverse of multi-caller expansion: records that were cloned per
//! caller are regrouped by (batch, working-BAM identity) and merged into a
//! single record whose `variants` list holds one entry per caller, ordered
//! by the originally configured caller list rather than by completion order.

use crate::errors::{Result, VcallError};
use crate::expand::{get_variantcaller, CallerKey};
use crate::parallel::DEFAULT_CALLER;
use crate::sample::{Sample, VariantCall, VrnFile};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Grouping identity for combination: batch and working BAM(s). Caller is
/// deliberately excluded so all callers for one sample collapse together.
type CombineKey = (String, Vec<PathBuf>);

/// Collapses variant calls from multiple approaches into single records with
/// a populated `variants` list.
///
/// For each (batch, BAM) group:
/// - every member with a variant caller contributes one entry, using the
///   pre-joint-calling file when a joint caller also ran;
/// - members with a joint caller contribute an additional joint entry with
///   upload suppressed;
/// - members with neither contribute a `precalled` placeholder entry.
///
/// When the group's representative carries expansion provenance and more
/// than one entry resulted, entries are ordered by each caller's position in
/// the original variantcaller list followed by the original jointcaller
/// list, and the original lists are restored as the active configuration.
/// A single resulting entry preserves encounter order.
///
/// # Errors
/// Returns a configuration error when an entry's caller appears in neither
/// original list, which would make the requested ordering ambiguous.
pub fn combine_multiple_callers(samples: Vec<Sample>) -> Result<Vec<Sample>> {
    let mut by_bam: IndexMap<CombineKey, Vec<CallGroupMember>> = IndexMap::new();
    for data in samples {
        let key = (data.batch_key().to_string(), data.work_bam_key());
        let variantcaller = get_variantcaller(&data, CallerKey::Variant, Some(DEFAULT_CALLER))
            .and_then(|selection| selection.as_single().map(String::from));
        let jointcaller = get_variantcaller(&data, CallerKey::Joint, None)
            .and_then(|selection| selection.as_single().map(String::from));
        by_bam
            .entry(key)
            .or_default()
            .push(CallGroupMember { variantcaller, jointcaller, data });
    }
    let mut out = Vec::with_capacity(by_bam.len());
    for (_, callgroup) in by_bam {
        out.push(combine_group(callgroup)?);
    }
    Ok(out)
}

struct CallGroupMember {
    variantcaller: Option<String>,
    jointcaller: Option<String>,
    data: Sample,
}

fn combine_group(mut callgroup: Vec<CallGroupMember>) -> Result<Sample> {
    let mut ready_calls = Vec::new();
    for member in &callgroup {
        ready_calls.extend(member_calls(member));
    }
    let mut final_data = callgroup.swap_remove(0).data;
    let multiple = ready_calls.len() > 1;
    if multiple && final_data.provenance.variantcaller.is_some() {
        sort_by_original_order(&mut ready_calls, &final_data)?;
        final_data.config.variantcaller = final_data.provenance.variantcaller.take();
        if let Some(orig_joint) = final_data.provenance.jointcaller.take() {
            final_data.config.jointcaller = Some(orig_joint);
        }
    }
    final_data.variants = ready_calls;
    final_data.vrn_file_batch = None;
    final_data.vrn_file_orig = None;
    final_data.vrn_file_plus.clear();
    final_data.vrn_stats = None;
    Ok(final_data)
}

/// Builds the `variants` entries one group member contributes.
fn member_calls(member: &CallGroupMember) -> Vec<VariantCall> {
    let data = &member.data;
    let mut calls = Vec::new();
    if let Some(variantcaller) = &member.variantcaller {
        let joint = member.jointcaller.is_some();
        // With a joint caller the per-sample file is superseded by the joint
        // output, so batch and validation metadata move to the joint entry.
        let vrn_file = if joint {
            data.vrn_file_orig.clone()
        } else {
            primary_path(data.vrn_file.as_ref())
        };
        calls.push(VariantCall {
            variantcaller: variantcaller.clone(),
            vrn_file,
            vrn_file_batch: if joint { None } else { data.vrn_file_batch.clone() },
            vrn_stats: data.vrn_stats.clone(),
            validate: if joint { None } else { data.validate.clone() },
            population: joint.then_some(false),
            plus_files: data.vrn_file_plus.clone(),
            ..VariantCall::default()
        });
    }
    if let Some(jointcaller) = &member.jointcaller {
        calls.push(VariantCall {
            variantcaller: jointcaller.clone(),
            vrn_file: primary_path(data.vrn_file.as_ref()),
            vrn_file_batch: data.vrn_file_batch.clone(),
            validate: data.validate.clone(),
            do_upload: false,
            ..VariantCall::default()
        });
    }
    if member.variantcaller.is_none() && member.jointcaller.is_none() {
        calls.push(VariantCall {
            variantcaller: "precalled".to_string(),
            vrn_file: primary_path(data.vrn_file.as_ref()),
            validate: data.validate.clone(),
            do_upload: false,
            ..VariantCall::default()
        });
    }
    calls
}

fn primary_path(vrn_file: Option<&VrnFile>) -> Option<PathBuf> {
    vrn_file.and_then(VrnFile::primary).map(Path::to_path_buf)
}

/// Sorts entries by caller position in the concatenation of the original
/// variantcaller list and the original jointcaller list.
fn sort_by_original_order(calls: &mut [VariantCall], final_data: &Sample) -> Result<()> {
    let variant_names: Vec<&str> = final_data
        .provenance
        .variantcaller
        .as_ref()
        .map(|selection| selection.names())
        .unwrap_or_default();
    let joint_names: Vec<&str> = final_data
        .provenance
        .jointcaller
        .as_ref()
        .map(|selection| selection.names())
        .unwrap_or_default();
    let mut keyed = Vec::with_capacity(calls.len());
    for call in calls.iter() {
        let name = call.variantcaller.as_str();
        let index = variant_names
            .iter()
            .position(|n| *n == name)
            .or_else(|| {
                joint_names
                    .iter()
                    .position(|n| *n == name)
                    .map(|i| variant_names.len() + i)
            })
            .ok_or_else(|| VcallError::InvalidConfig {
                sample: final_data.description.clone(),
                reason: format!(
                    "caller '{name}' appears in neither the original variantcaller \
                     nor jointcaller list"
                ),
            })?;
        keyed.push(index);
    }
    // Stable sort keeps encounter order for entries sharing a position.
    let mut order: Vec<usize> = (0..calls.len()).collect();
    order.sort_by_key(|&i| keyed[i]);
    let mut sorted: Vec<VariantCall> = order.iter().map(|&i| calls[i].clone()).collect();
    calls.swap_with_slice(&mut sorted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{BamInputs, CallerProvenance, CallerSelection};

    fn called(name: &str, caller: &str, vrn: &str) -> Sample {
        let mut sample = Sample::new(name, "/work");
        sample.align_bam = Some(BamInputs::One(PathBuf::from("x.bam")));
        sample.batch = Some("B1".to_string());
        sample.config.variantcaller = Some(CallerSelection::One(caller.to_string()));
        sample.vrn_file = Some(VrnFile::One(PathBuf::from(vrn)));
        sample
    }

    fn with_provenance(mut sample: Sample, variant: &[&str], joint: &[&str]) -> Sample {
        sample.provenance = CallerProvenance {
            variantcaller: Some(CallerSelection::Many(
                variant.iter().map(|s| s.to_string()).collect(),
            )),
            jointcaller: if joint.is_empty() {
                None
            } else {
                Some(CallerSelection::Many(joint.iter().map(|s| s.to_string()).collect()))
            },
        };
        sample
    }

    #[test]
    fn test_original_order_restored_regardless_of_completion_order() {
        // freebayes finished first; configured order was samtools, freebayes.
        let a = with_provenance(
            called("S1", "freebayes", "/work/fb.vcf.gz"),
            &["samtools", "freebayes"],
            &[],
        );
        let b = with_provenance(
            called("S1", "samtools", "/work/st.vcf.gz"),
            &["samtools", "freebayes"],
            &[],
        );
        let out = combine_multiple_callers(vec![a, b]).unwrap();
        assert_eq!(out.len(), 1);
        let callers: Vec<&str> =
            out[0].variants.iter().map(|v| v.variantcaller.as_str()).collect();
        assert_eq!(callers, vec!["samtools", "freebayes"]);
        assert_eq!(
            out[0].config.variantcaller,
            Some(CallerSelection::Many(vec!["samtools".into(), "freebayes".into()])),
            "configuration must be restored to its pre-expansion form"
        );
        assert!(out[0].provenance.is_empty());
    }

    #[test]
    fn test_joint_caller_produces_two_entries_with_suppression() {
        let mut sample = called("S1", "gatk-haplotype", "/work/joint.vcf.gz");
        sample.config.jointcaller =
            Some(CallerSelection::One("gatk-haplotype-joint".to_string()));
        sample.vrn_file_orig = Some(PathBuf::from("/work/prejoint.vcf.gz"));
        sample.vrn_file_batch = Some(PathBuf::from("/work/batch.vcf.gz"));
        sample.validate = Some(serde_json::json!({"grading": "ok"}));
        let out = combine_multiple_callers(vec![sample]).unwrap();
        let variants = &out[0].variants;
        assert_eq!(variants.len(), 2);
        let caller_entry = &variants[0];
        assert_eq!(caller_entry.variantcaller, "gatk-haplotype");
        assert_eq!(caller_entry.vrn_file, Some(PathBuf::from("/work/prejoint.vcf.gz")));
        assert_eq!(caller_entry.vrn_file_batch, None, "batch file suppressed under joint calling");
        assert_eq!(caller_entry.validate, None, "validation suppressed under joint calling");
        assert_eq!(caller_entry.population, Some(false));
        assert!(caller_entry.do_upload);
        let joint_entry = &variants[1];
        assert_eq!(joint_entry.variantcaller, "gatk-haplotype-joint");
        assert_eq!(joint_entry.vrn_file, Some(PathBuf::from("/work/joint.vcf.gz")));
        assert!(!joint_entry.do_upload, "joint output is not a final deliverable");
    }

    #[test]
    fn test_precalled_placeholder_for_uncalled_samples() {
        let mut sample = Sample::new("S1", "/work");
        sample.vrn_file = Some(VrnFile::One(PathBuf::from("/work/precalled/S1.vcf")));
        let out = combine_multiple_callers(vec![sample]).unwrap();
        assert_eq!(out[0].variants.len(), 1);
        let entry = &out[0].variants[0];
        assert_eq!(entry.variantcaller, "precalled");
        assert!(!entry.do_upload);
    }

    #[test]
    fn test_single_entry_preserves_encounter_order_without_sort() {
        let sample = with_provenance(
            called("S1", "samtools", "/work/st.vcf.gz"),
            &["samtools"],
            &[],
        );
        let out = combine_multiple_callers(vec![sample]).unwrap();
        assert_eq!(out[0].variants.len(), 1);
        assert_eq!(
            out[0].config.variantcaller,
            Some(CallerSelection::One("samtools".into())),
            "single-entry groups keep the expanded configuration untouched"
        );
    }

    #[test]
    fn test_joint_entries_ordered_after_variant_callers() {
        let mut a = with_provenance(
            called("S1", "gatk-haplotype", "/work/joint.vcf.gz"),
            &["gatk-haplotype", "samtools"],
            &["gatk-haplotype-joint"],
        );
        a.config.jointcaller = Some(CallerSelection::One("gatk-haplotype-joint".into()));
        a.vrn_file_orig = Some(PathBuf::from("/work/prejoint.vcf.gz"));
        let b = with_provenance(
            called("S1", "samtools", "/work/st.vcf.gz"),
            &["gatk-haplotype", "samtools"],
            &["gatk-haplotype-joint"],
        );
        let out = combine_multiple_callers(vec![b, a]).unwrap();
        let callers: Vec<&str> =
            out[0].variants.iter().map(|v| v.variantcaller.as_str()).collect();
        assert_eq!(
            callers,
            vec!["gatk-haplotype", "samtools", "gatk-haplotype-joint"],
            "joint entries follow the full variantcaller list"
        );
        assert_eq!(
            out[0].config.jointcaller,
            Some(CallerSelection::Many(vec!["gatk-haplotype-joint".into()]))
        );
    }

    #[test]
    fn test_unknown_sort_caller_is_config_error() {
        let a = with_provenance(called("S1", "samtools", "/a.vcf"), &["freebayes"], &[]);
        let b = with_provenance(called("S1", "varscan", "/b.vcf"), &["freebayes"], &[]);
        let err = combine_multiple_callers(vec![a, b]).unwrap_err();
        assert!(matches!(err, VcallError::InvalidConfig { .. }));
    }

    #[test]
    fn test_staging_fields_discarded() {
        let mut sample = called("S1", "samtools", "/work/st.vcf.gz");
        sample.vrn_file_batch = Some(PathBuf::from("/b.vcf"));
        sample.vrn_file_orig = Some(PathBuf::from("/o.vcf"));
        sample.vrn_stats = Some(serde_json::json!({"count": 10}));
        sample
            .vrn_file_plus
            .insert("effects".to_string(), PathBuf::from("/e.vcf"));
        let out = combine_multiple_callers(vec![sample]).unwrap();
        assert_eq!(out[0].vrn_file_batch, None);
        assert_eq!(out[0].vrn_file_orig, None);
        assert!(out[0].vrn_file_plus.is_empty());
        assert_eq!(out[0].vrn_stats, None);
        // The entry itself still carries what calling staged for it.
        assert_eq!(out[0].variants[0].vrn_file_batch, Some(PathBuf::from("/b.vcf")));
        assert_eq!(
            out[0].variants[0].plus_files.get("effects"),
            Some(&PathBuf::from("/e.vcf"))
        );
    }

    #[test]
    fn test_distinct_batches_stay_separate() {
        let mut a = called("S1", "samtools", "/a.vcf");
        a.batch = Some("B1".into());
        let mut b = called("S2", "samtools", "/b.vcf");
        b.batch = Some("B2".into());
        let out = combine_multiple_callers(vec![a, b]).unwrap();
        assert_eq!(out.len(), 2);
    }
}
