//! Integration tests for the region-parallel calling orchestration.
//!
//! Run with: `cargo test --test pipeline_tests`
//!
//! These tests drive expansion -> split -> (stubbed execution) -> collapse ->
//! combine end-to-end. External tools never run: a stub execution delegate
//! fabricates per-sample outputs, and deliberately returns records in
//! reverse completion order to exercise ordering determinism.

use std::cell::RefCell;
use std::path::PathBuf;

use tempfile::TempDir;

use vcall_lib::combine::combine_multiple_callers;
use vcall_lib::expand::{get_variantcaller, CallerKey};
use vcall_lib::parallel::{
    parallel_variantcall_region, ExecutionDelegate, GroupFn, ParallelSpec, SplitFn,
};
use vcall_lib::region::Region;
use vcall_lib::sample::{BamInputs, CallerSelection, Sample, VrnFile};
use vcall_lib::split::SplitPlan;

/// Execution delegate that records split plans and fabricates outputs
/// without invoking any caller, completing samples in reverse order.
#[derive(Default)]
struct StubDelegate {
    plans: RefCell<Vec<SplitPlan>>,
}

impl ExecutionDelegate for StubDelegate {
    fn grouped_split_combine(
        &self,
        samples: Vec<Sample>,
        split_fn: &SplitFn<'_>,
        group_fn: &GroupFn<'_>,
        _spec: &ParallelSpec<'_>,
    ) -> anyhow::Result<Vec<Sample>> {
        let mut out = Vec::new();
        for group in group_fn(samples) {
            for mut data in group {
                let plan = split_fn(&data)?;
                let caller = get_variantcaller(&data, CallerKey::Variant, Some("gatk"))
                    .and_then(|s| s.as_scalar().map(String::from))
                    .unwrap_or_default();
                let out_file = plan.out_file.clone().unwrap_or_else(|| {
                    data.dirs.work.join(format!("{}-{caller}.vcf.gz", data.description))
                });
                self.plans.borrow_mut().push(plan);
                data.vrn_file = Some(VrnFile::One(out_file));
                out.push(data);
            }
        }
        // Simulate unordered completion across workers.
        out.reverse();
        Ok(out)
    }
}

fn bam_sample(dir: &TempDir, name: &str, bam_name: &str) -> Sample {
    let bam = dir.path().join(bam_name);
    std::fs::write(&bam, b"bam").unwrap();
    let mut sample = Sample::new(name, dir.path());
    sample.align_bam = Some(BamInputs::One(bam));
    sample
}

#[test]
fn test_multi_caller_round_trip_restores_configured_order() {
    let dir = TempDir::new().unwrap();
    let mut sample = bam_sample(&dir, "S1", "x.bam");
    sample.batch = Some("B1".to_string());
    sample.config.variantcaller =
        Some(CallerSelection::Many(vec!["samtools".into(), "freebayes".into()]));

    let delegate = StubDelegate::default();
    let called = parallel_variantcall_region(vec![sample], &delegate).unwrap();
    assert_eq!(called.len(), 2, "one collapsed record per expanded caller");

    let finished = combine_multiple_callers(called).unwrap();
    assert_eq!(finished.len(), 1);
    let final_sample = &finished[0];
    let callers: Vec<&str> =
        final_sample.variants.iter().map(|v| v.variantcaller.as_str()).collect();
    assert_eq!(
        callers,
        vec!["samtools", "freebayes"],
        "configured order restored despite reversed completion order"
    );
    // Each entry carries its own caller's output.
    for call in &final_sample.variants {
        let path = call.vrn_file.as_ref().unwrap().display().to_string();
        assert!(
            path.contains(&call.variantcaller),
            "entry for {} points at {path}",
            call.variantcaller
        );
        assert!(call.do_upload);
    }
    // Configuration is un-expanded back to the original list.
    assert_eq!(
        final_sample.config.variantcaller,
        Some(CallerSelection::Many(vec!["samtools".into(), "freebayes".into()]))
    );
}

#[test]
fn test_region_split_plan_shapes() {
    let dir = TempDir::new().unwrap();
    // Unsplit sample: no regions assigned.
    let mut unsplit = bam_sample(&dir, "S1", "s1.bam");
    unsplit.config.variantcaller = Some(CallerSelection::One("samtools".into()));
    // Split sample: two regions over one BAM.
    let mut split = bam_sample(&dir, "S2", "s2.bam");
    split.config.variantcaller = Some(CallerSelection::One("samtools".into()));
    split.region = Some(vec![Region::new("chr1", 0, 100), Region::new("chr2", 0, 200)]);
    split.region_bams = Some(vec![vec![dir.path().join("s2.bam")]]);

    let delegate = StubDelegate::default();
    parallel_variantcall_region(vec![unsplit, split], &delegate).unwrap();

    let plans = delegate.plans.borrow();
    assert_eq!(plans.len(), 2);
    let unsplit_plan = &plans[0];
    assert_eq!(unsplit_plan.out_file, None);
    assert!(unsplit_plan.parts.is_empty(), "unsplit samples produce no work units");
    let split_plan = &plans[1];
    assert!(split_plan.out_file.is_some());
    assert_eq!(split_plan.parts.len(), 2);
    assert_ne!(
        split_plan.parts[0].out_file, split_plan.parts[1].out_file,
        "work units must have distinct output paths"
    );
}

#[test]
fn test_precalled_fallback_produces_single_placeholder_entry() {
    let dir = TempDir::new().unwrap();
    let external = dir.path().join("external.vcf.gz");
    std::fs::write(&external, b"calls").unwrap();
    let mut sample = Sample::new("S1", dir.path());
    sample.vrn_file = Some(VrnFile::One(external));

    let delegate = StubDelegate::default();
    let called = parallel_variantcall_region(vec![sample], &delegate).unwrap();
    assert_eq!(called.len(), 1);
    assert!(delegate.plans.borrow().is_empty(), "precalled samples never split");

    let finished = combine_multiple_callers(called).unwrap();
    assert_eq!(finished[0].variants.len(), 1);
    let entry = &finished[0].variants[0];
    assert_eq!(entry.variantcaller, "precalled");
    assert!(!entry.do_upload);
    let staged = entry.vrn_file.as_ref().unwrap();
    assert!(
        staged.starts_with(dir.path().join("precalled")),
        "precalled variants staged into the working directory"
    );
    assert!(staged.exists());
}

#[test]
fn test_joint_caller_entries_and_upload_suppression() {
    let dir = TempDir::new().unwrap();
    let mut sample = bam_sample(&dir, "S1", "x.bam");
    sample.config.variantcaller =
        Some(CallerSelection::Many(vec!["gatk-haplotype".into()]));
    sample.config.jointcaller =
        Some(CallerSelection::Many(vec!["gatk-haplotype-joint".into()]));
    sample.vrn_file_orig = Some(dir.path().join("prejoint.vcf.gz"));

    let delegate = StubDelegate::default();
    let called = parallel_variantcall_region(vec![sample], &delegate).unwrap();
    let finished = combine_multiple_callers(called).unwrap();

    let variants = &finished[0].variants;
    assert_eq!(variants.len(), 2);
    assert_eq!(variants[0].variantcaller, "gatk-haplotype");
    assert_eq!(
        variants[0].vrn_file,
        Some(dir.path().join("prejoint.vcf.gz")),
        "caller entry uses the pre-joint-calling file"
    );
    assert_eq!(variants[0].validate, None, "validation suppressed under joint calling");
    assert!(variants[0].do_upload);
    assert_eq!(variants[1].variantcaller, "gatk-haplotype-joint");
    assert!(!variants[1].do_upload, "joint output is not a final deliverable");
}

#[test]
fn test_mixed_called_and_precalled_samples() {
    let dir = TempDir::new().unwrap();
    let mut called_sample = bam_sample(&dir, "S1", "x.bam");
    called_sample.config.variantcaller = Some(CallerSelection::One("samtools".into()));
    let external = dir.path().join("external.vcf");
    std::fs::write(&external, b"calls").unwrap();
    let mut precalled_sample = Sample::new("S2", dir.path());
    precalled_sample.vrn_file = Some(VrnFile::One(external));

    let delegate = StubDelegate::default();
    let called =
        parallel_variantcall_region(vec![called_sample, precalled_sample], &delegate).unwrap();
    assert_eq!(called.len(), 2);
    // Precalled extras come first, then called samples.
    assert_eq!(called[0].description, "S2");
    assert_eq!(called[1].description, "S1");

    let finished = combine_multiple_callers(called).unwrap();
    assert_eq!(finished.len(), 2);
    let by_name = |name: &str| {
        finished.iter().find(|d| d.description == name).expect("sample present")
    };
    assert_eq!(by_name("S2").variants[0].variantcaller, "precalled");
    assert_eq!(by_name("S1").variants[0].variantcaller, "samtools");
}

#[test]
fn test_expanded_clones_share_readonly_inputs() {
    let dir = TempDir::new().unwrap();
    let mut sample = bam_sample(&dir, "S1", "x.bam");
    sample.config.variantcaller =
        Some(CallerSelection::Many(vec!["samtools".into(), "freebayes".into()]));
    sample.region = Some(vec![Region::new("chr1", 0, 100)]);
    sample.region_bams = Some(vec![vec![dir.path().join("x.bam")]]);

    let delegate = StubDelegate::default();
    parallel_variantcall_region(vec![sample], &delegate).unwrap();

    let plans = delegate.plans.borrow();
    assert_eq!(plans.len(), 2, "each expanded caller gets its own split plan");
    // Same input BAM, caller-namespaced outputs.
    assert_eq!(plans[0].parts[0].bams, plans[1].parts[0].bams);
    assert_ne!(
        plans[0].out_file, plans[1].out_file,
        "output paths are namespaced by caller to avoid collisions"
    );
}
