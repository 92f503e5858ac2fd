//! Concrete caller adapters wrapping external variant-calling tools.

pub mod samtools;
