//! Multi-caller expansion: splitting one sample record into one clone per
//! requested caller.
//!
//! A sample sheet may request several variant callers (and joint callers)
//! for one sample. Region splitting and calling operate on records with
//! exactly one concrete caller, so records with a caller list are expanded
//! into independent clones here and collapsed back together by
//! [`crate::combine`] after calling finishes. The original list is recorded
//! in the record's provenance exactly once so the combiner can restore the
//! configured ordering.

use crate::sample::{CallerSelection, Sample};

/// Which caller configuration key an operation applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallerKey {
    /// `config.variantcaller`
    Variant,
    /// `config.jointcaller`
    Joint,
}

/// Looks up the caller selection for a key, substituting `default` when the
/// key is absent. Samples without alignment inputs never call and always
/// resolve to `None`.
#[must_use]
pub fn get_variantcaller(
    data: &Sample,
    key: CallerKey,
    default: Option<&str>,
) -> Option<CallerSelection> {
    if data.align_bam.is_none() {
        return None;
    }
    let configured = match key {
        CallerKey::Variant => data.config.variantcaller.as_ref(),
        CallerKey::Joint => data.config.jointcaller.as_ref(),
    };
    configured
        .cloned()
        .or_else(|| default.map(|name| CallerSelection::One(name.to_string())))
}

/// The configured caller names for a key, normalized to a list. Empty when
/// calling is absent or disabled.
#[must_use]
pub fn caller_names(data: &Sample, key: CallerKey) -> Vec<String> {
    get_variantcaller(data, key, None)
        .map(|selection| selection.names().into_iter().map(String::from).collect())
        .unwrap_or_default()
}

/// Expands a sample that potentially requires multiple calling approaches.
///
/// - A scalar selection returns the record unchanged, as a single element.
/// - An absent or disabled selection returns no records (the caller handles
///   the precalled/fallback path).
/// - A list produces one deep clone per caller, each with that caller as its
///   concrete selection and the full original list stashed in provenance.
///   The stash is write-once: re-expanding an already expanded record keeps
///   the first recorded original.
///
/// When expanding by variant caller, configured joint callers are
/// partitioned across the clones: each clone keeps the first joint caller
/// whose identifier is prefixed by the clone's variant caller identifier;
/// clones with no matching joint caller have joint calling explicitly
/// disabled.
#[must_use]
pub fn handle_multiple_callers(
    data: &Sample,
    key: CallerKey,
    default: Option<&str>,
) -> Vec<Sample> {
    let Some(selection) = get_variantcaller(data, key, default) else {
        return Vec::new();
    };
    match &selection {
        CallerSelection::One(_) => vec![data.clone()],
        CallerSelection::Disabled(_) => Vec::new(),
        CallerSelection::Many(names) if names.is_empty() => Vec::new(),
        CallerSelection::Many(names) => {
            let mut out = Vec::with_capacity(names.len());
            for caller in names {
                let mut base = data.clone();
                match key {
                    CallerKey::Variant => {
                        base.provenance.stash_variantcaller(&selection);
                        base.config.variantcaller = Some(CallerSelection::One(caller.clone()));
                        partition_jointcallers(&mut base, data, caller);
                    }
                    CallerKey::Joint => {
                        base.provenance.stash_jointcaller(&selection);
                        base.config.jointcaller = Some(CallerSelection::One(caller.clone()));
                    }
                }
                out.push(base);
            }
            out
        }
    }
}

/// Assigns each variant-caller clone its share of the configured joint
/// callers, keyed by identifier prefix.
fn partition_jointcallers(base: &mut Sample, original: &Sample, caller: &str) {
    let jointcallers = caller_names(original, CallerKey::Joint);
    if jointcallers.is_empty() {
        return;
    }
    base.provenance
        .stash_jointcaller(&CallerSelection::Many(jointcallers.clone()));
    let matched = jointcallers.iter().find(|name| name.starts_with(caller));
    base.config.jointcaller = Some(match matched {
        Some(name) => CallerSelection::One(name.clone()),
        None => CallerSelection::Disabled(false),
    });
}
