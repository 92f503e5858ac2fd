//! Collapsing per-region results back to one record per sample and caller.
//!
//! After parallel per-region execution, every expanded record carries a
//! combined variant file but still holds region-scoped staging state. This
//! step regroups records by (batch, working-BAM identity, caller), keeps one
//! representative per group, and strips the transient region fields.

use crate::expand::{get_variantcaller, CallerKey};
use crate::parallel::DEFAULT_CALLER;
use crate::sample::Sample;
use indexmap::IndexMap;
use std::path::PathBuf;

/// Grouping identity for collapse: batch, normalized working BAM(s), caller.
type CollapseKey = (String, Vec<PathBuf>, Option<String>);

fn collapse_key(data: &Sample) -> CollapseKey {
    let caller = get_variantcaller(data, CallerKey::Variant, Some(DEFAULT_CALLER))
        .and_then(|selection| selection.as_scalar().map(String::from));
    (data.batch_key().to_string(), data.work_bam_key(), caller)
}

/// Collapses regions to a single representative per (batch, BAM, caller).
///
/// Group order follows first encounter. The representative drops its
/// `region`/`region_bams` staging fields; when per-region entries carried
/// more than one input each, the single-BAM working field is dropped too
/// since it no longer identifies the merged inputs.
#[must_use]
pub fn collapse_by_bam_variantcaller(samples: Vec<Sample>) -> Vec<Sample> {
    let mut by_bam: IndexMap<CollapseKey, Vec<Sample>> = IndexMap::new();
    for data in samples {
        by_bam.entry(collapse_key(&data)).or_default().push(data);
    }
    let mut out = Vec::with_capacity(by_bam.len());
    for (_, mut grouped) in by_bam {
        let mut cur = grouped.swap_remove(0);
        cur.region = None;
        let region_bams = cur.region_bams.take();
        if region_bams
            .as_ref()
            .and_then(|entries| entries.first())
            .is_some_and(|entry| entry.len() > 1)
        {
            cur.work_bam = None;
        }
        out.push(cur);
    }
    out
}
