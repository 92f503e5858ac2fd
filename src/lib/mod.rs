#![deny(unsafe_code)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::needless_pass_by_value,
    clippy::uninlined_format_args
)]

//! # vcall - Region-parallel multi-caller variant calling orchestration
//!
//! This library coordinates variant-calling steps in a genomics pipeline:
//! selecting a caller implementation per sample, splitting work by genomic
//! region, invoking external command-line tools, and recombining per-region
//! outputs into a single per-sample call set.
//!
//! ## Overview
//!
//! The pipeline for one batch of samples:
//!
//! 1. **[`expand`]** - samples requesting multiple callers are cloned into
//!    one record per caller, with the original list recorded as provenance
//! 2. **[`split`]** - each record's assigned regions become independent
//!    work units with collision-free output paths
//! 3. **[`parallel`]** - an execution delegate runs the per-region calling
//!    task (**[`registry`]**) and concatenates region outputs
//! 4. **[`collapse`]** - per-region results regroup to one record per
//!    (batch, BAM, caller)
//! 5. **[`combine`]** - callers for one sample merge into a single record
//!    whose `variants` list restores the originally configured order
//!
//! Samples that arrive with externally called variants bypass all of this
//! through **[`precalled`]**, and **[`filtration`]** routes finished calls
//! to caller-specific filtering.
//!
//! ## External tools
//!
//! Calling is delegated to external binaries (samtools, bcftools, gatk)
//! through **[`exec`]**; the adapters in **[`callers`]** compose them into
//! idempotent, transactional output steps.

pub mod annotation;
pub mod callers;
pub mod collapse;
pub mod combine;
pub mod errors;
pub mod exec;
pub mod expand;
pub mod filtration;
pub mod fsutil;
pub mod logging;
pub mod parallel;
pub mod phasing;
pub mod precalled;
pub mod region;
pub mod registry;
pub mod sample;
pub mod split;
pub mod validation;
pub mod vcfutils;
