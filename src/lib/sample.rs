//! Pipeline sample records and their configuration surface.
//!
//! A [`Sample`] is one unit of pipeline state: the alignment inputs for one
//! sample (or batched group of samples), the requested caller configuration,
//! per-region staging fields populated while calling is in flight, and the
//! terminal `variants` list populated by the multi-caller combiner.
//!
//! Records are cloned during multi-caller expansion, so everything here is a
//! plain value type. Configuration is immutable by convention: expansion
//! builds new [`AlgorithmConfig`] values instead of mutating shared state,
//! and the original pre-expansion caller lists live in an explicit
//! [`CallerProvenance`] sub-structure rather than being smuggled into the
//! active configuration.

use crate::region::Region;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Alignment input paths: a single BAM or an ordered set of BAMs.
///
/// Both forms deserialize from sample sheets (`"x.bam"` or `["a.bam",
/// "b.bam"]`) and normalize to the same grouping identity, so records that
/// reference the same inputs collapse together regardless of which spelling
/// produced them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BamInputs {
    /// A single alignment file
    One(PathBuf),
    /// Multiple alignment files analyzed together
    Many(Vec<PathBuf>),
}

impl BamInputs {
    /// All paths in declaration order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            Self::One(path) => std::slice::from_ref(path),
            Self::Many(paths) => paths,
        }
    }

    /// Normalized identity used as a grouping key.
    #[must_use]
    pub fn key(&self) -> Vec<PathBuf> {
        self.paths().to_vec()
    }
}

/// A caller configuration value: disabled, one caller, or an ordered list.
///
/// Mirrors the shapes a sample sheet can carry: `false`, `"samtools"`, or
/// `["samtools", "freebayes"]`. An absent key is modeled as `Option::None`
/// on the containing struct.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallerSelection {
    /// Calling explicitly disabled (`false` in the sample sheet)
    Disabled(bool),
    /// A single caller identifier
    One(String),
    /// An ordered list of caller identifiers
    Many(Vec<String>),
}

impl CallerSelection {
    /// True when this selection asks for at least one caller.
    #[must_use]
    pub fn is_requested(&self) -> bool {
        match self {
            Self::Disabled(_) => false,
            Self::One(_) => true,
            Self::Many(names) => !names.is_empty(),
        }
    }

    /// Caller names in declaration order; empty when disabled.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Disabled(_) => Vec::new(),
            Self::One(name) => vec![name.as_str()],
            Self::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// The single configured caller, if this is a scalar selection.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::One(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// The sole caller name, accepting both a scalar and a one-element list.
    #[must_use]
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::One(name) => Some(name.as_str()),
            Self::Many(names) if names.len() == 1 => Some(names[0].as_str()),
            _ => None,
        }
    }
}

/// The algorithm section of a sample's configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmConfig {
    /// Requested variant caller(s); absent means use the pipeline default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variantcaller: Option<CallerSelection>,
    /// Requested joint caller(s)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jointcaller: Option<CallerSelection>,
    /// Read-backed phasing mode (`"gatk"` enables it)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phasing: Option<String>,
    /// BED file restricting calling to target regions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_regions: Option<PathBuf>,
}

/// Original pre-expansion caller lists, recorded when a record is split into
/// one clone per caller.
///
/// Each field is written at most once per record lineage so that nested
/// expansion (variantcaller, then jointcaller) cannot clobber the original
/// ordering the combiner needs to restore.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallerProvenance {
    /// Original `variantcaller` value before expansion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variantcaller: Option<CallerSelection>,
    /// Original `jointcaller` value before expansion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jointcaller: Option<CallerSelection>,
}

impl CallerProvenance {
    /// Records the original variantcaller selection unless already recorded.
    pub fn stash_variantcaller(&mut self, selection: &CallerSelection) {
        if self.variantcaller.is_none() {
            self.variantcaller = Some(selection.clone());
        }
    }

    /// Records the original jointcaller selection unless already recorded.
    pub fn stash_jointcaller(&mut self, selection: &CallerSelection) {
        if self.jointcaller.is_none() {
            self.jointcaller = Some(selection.clone());
        }
    }

    /// True when no expansion has recorded anything yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variantcaller.is_none() && self.jointcaller.is_none()
    }
}

/// Variant file input: a single path, or a sequence from the sample sheet.
///
/// Sequences are only legal for externally supplied (precalled) variants,
/// and even then must contain exactly one path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VrnFile {
    /// A single variant file
    One(PathBuf),
    /// A sequence of variant files (validated to a single element)
    Many(Vec<PathBuf>),
}

impl VrnFile {
    /// The primary path: the single path, or the first of a sequence.
    #[must_use]
    pub fn primary(&self) -> Option<&Path> {
        match self {
            Self::One(path) => Some(path),
            Self::Many(paths) => paths.first().map(PathBuf::as_path),
        }
    }
}

impl From<PathBuf> for VrnFile {
    fn from(path: PathBuf) -> Self {
        Self::One(path)
    }
}

/// Working directories for a sample.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dirs {
    /// Root of the pipeline working directory
    pub work: PathBuf,
}

/// One entry of a sample's final `variants` list: the finished calls from a
/// single caller (or joint caller, or the `precalled` placeholder).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantCall {
    /// Caller that produced this call set
    pub variantcaller: String,
    /// Final variant file for this caller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrn_file: Option<PathBuf>,
    /// Batch-level merged variant file, when batch calling ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrn_file_batch: Option<PathBuf>,
    /// Caller statistics carried through from calling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrn_stats: Option<Value>,
    /// Validation metadata, when a truth set comparison ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate: Option<Value>,
    /// Population/batch handling flag; `Some(false)` suppresses it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population: Option<bool>,
    /// Whether this entry is a final deliverable
    pub do_upload: bool,
    /// Extra per-caller companion files
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub plus_files: BTreeMap<String, PathBuf>,
}

impl Default for VariantCall {
    fn default() -> Self {
        Self {
            variantcaller: String::new(),
            vrn_file: None,
            vrn_file_batch: None,
            vrn_stats: None,
            validate: None,
            population: None,
            do_upload: true,
            plus_files: BTreeMap::new(),
        }
    }
}

/// One unit of pipeline state for a sample.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sample {
    /// Sample name
    pub description: String,
    /// Batch this sample is analyzed with (e.g. a tumor/normal pair)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    /// Names of grouped samples when batch members are analyzed together;
    /// the first entry names shared outputs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Vec<String>>,
    /// Original per-sample records for grouped analyses, parallel to the
    /// grouped alignment inputs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_orig: Option<Vec<Sample>>,
    /// Sample phenotype (`tumor`/`normal`) for paired analyses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phenotype: Option<String>,
    /// Sample sex, consumed by sex-linked region filtration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    /// Working directories
    pub dirs: Dirs,
    /// Reference sequence FASTA
    pub sam_ref: PathBuf,
    /// Alignment input(s)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align_bam: Option<BamInputs>,
    /// Working single-BAM path while region processing is in flight
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_bam: Option<PathBuf>,
    /// Merged BAM produced by an upstream combine step; takes precedence
    /// over `align_bam` as the sample's grouping identity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combine_work_bam: Option<PathBuf>,
    /// Algorithm configuration
    pub config: AlgorithmConfig,
    /// Original caller lists recorded during multi-caller expansion
    #[serde(skip_serializing_if = "CallerProvenance::is_empty")]
    pub provenance: CallerProvenance,
    /// Regions assigned to this sample for split processing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<Vec<Region>>,
    /// Per-input alignment files, each entry singular or parallel to `region`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_bams: Option<Vec<Vec<PathBuf>>>,
    /// Working variant file (raw output, or externally supplied calls)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrn_file: Option<VrnFile>,
    /// Batch-level merged variant file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrn_file_batch: Option<PathBuf>,
    /// Pre-joint-calling per-sample variant file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrn_file_orig: Option<PathBuf>,
    /// Extra per-caller companion files staged for the combiner
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub vrn_file_plus: BTreeMap<String, PathBuf>,
    /// Caller statistics staged for the combiner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vrn_stats: Option<Value>,
    /// Validation metadata staged for the combiner
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validate: Option<Value>,
    /// Known-variant association files (e.g. `dbsnp`)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub assoc_files: BTreeMap<String, PathBuf>,
    /// Final per-caller call sets, populated by the combiner
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<VariantCall>,
}

impl Sample {
    /// Creates a minimal sample record.
    #[must_use]
    pub fn new(description: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            description: description.into(),
            dirs: Dirs { work: work_dir.into() },
            ..Self::default()
        }
    }

    /// Name used for split outputs: the first grouped sample name when batch
    /// members are analyzed together, otherwise the sample's own name.
    #[must_use]
    pub fn split_name(&self) -> &str {
        self.group
            .as_ref()
            .and_then(|names| names.first())
            .map_or(self.description.as_str(), String::as_str)
    }

    /// Batch component of grouping keys: the batch name, or the sample name
    /// for unbatched samples.
    #[must_use]
    pub fn batch_key(&self) -> &str {
        self.batch.as_deref().unwrap_or(&self.description)
    }

    /// Normalized working-BAM identity for grouping: the combined BAM when an
    /// upstream merge produced one, otherwise the alignment input(s).
    #[must_use]
    pub fn work_bam_key(&self) -> Vec<PathBuf> {
        if let Some(combined) = &self.combine_work_bam {
            vec![combined.clone()]
        } else {
            self.align_bam.as_ref().map(BamInputs::key).unwrap_or_default()
        }
    }
}
