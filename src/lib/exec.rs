//! External tool invocation: logged command execution and version probing.
//!
//! External binaries (samtools, bcftools, gatk) are resolved by name, with a
//! `VCALL_<TOOL>` environment override so deployments can pin specific
//! installations. Failures carry the sample/caller/region context supplied by
//! the calling step so a failing unit can be located among many parallel ones.

use crate::errors::{Result, VcallError};
use log::info;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;

/// Resolves the executable for an external tool, honoring a `VCALL_<TOOL>`
/// environment override (e.g. `VCALL_SAMTOOLS=/opt/samtools/bin/samtools`).
#[must_use]
pub fn program_path(tool: &str) -> PathBuf {
    let var = format!("VCALL_{}", tool.to_uppercase());
    std::env::var_os(var).map_or_else(|| PathBuf::from(tool), PathBuf::from)
}

/// Runs an external command to completion, logging the invocation.
///
/// # Arguments
/// * `cmd` - The prepared command
/// * `tool` - Tool name for error reporting
/// * `context` - Operation description (sample/caller/region)
///
/// # Errors
/// Returns [`VcallError::ToolFailed`] on spawn failure or non-zero exit.
pub fn run(cmd: &mut Command, tool: &str, context: &str) -> Result<()> {
    info!("{context}: {cmd:?}");
    let status = cmd.status().map_err(|e| VcallError::ToolFailed {
        tool: tool.to_string(),
        context: context.to_string(),
        detail: e.to_string(),
    })?;
    if !status.success() {
        return Err(VcallError::ToolFailed {
            tool: tool.to_string(),
            context: context.to_string(),
            detail: format!("exit status {status}"),
        });
    }
    Ok(())
}

/// Probes an external tool's version from its `--version` output.
///
/// # Errors
/// Returns an error when the tool cannot be executed or no version number
/// appears in its output.
pub fn program_version(tool: &str) -> Result<ToolVersion> {
    let output = Command::new(program_path(tool))
        .arg("--version")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| VcallError::ToolFailed {
            tool: tool.to_string(),
            context: "version probe".to_string(),
            detail: e.to_string(),
        })?;
    // Some tools print version information on stderr.
    let text = if output.stdout.is_empty() { output.stderr } else { output.stdout };
    let text = String::from_utf8_lossy(&text);
    text.lines()
        .find_map(|line| extract_version(line))
        .ok_or_else(|| VcallError::ToolFailed {
            tool: tool.to_string(),
            context: "version probe".to_string(),
            detail: "no version number in --version output".to_string(),
        })
}

fn extract_version(line: &str) -> Option<ToolVersion> {
    line.split_whitespace().find_map(|token| {
        let token = token.trim_start_matches('v');
        if token.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            token.parse().ok()
        } else {
            None
        }
    })
}

/// Ensures a BAM index exists next to `bam`, creating one with `samtools
/// index` when absent.
///
/// # Errors
/// Returns an error when indexing fails.
pub fn index_bam(bam: &Path) -> Result<()> {
    let mut index = bam.as_os_str().to_os_string();
    index.push(".bai");
    if Path::new(&index).exists() {
        return Ok(());
    }
    let mut cmd = Command::new(program_path("samtools"));
    cmd.arg("index").arg(bam);
    run(&mut cmd, "samtools", &format!("indexing {}", bam.display()))
}

/// Dotted tool version with loose numeric comparison (`1.9` < `1.10`,
/// missing components compare as zero).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolVersion {
    parts: Vec<u32>,
    raw: String,
}

impl ToolVersion {
    /// Builds a version from numeric components, for comparison floors.
    #[must_use]
    pub fn from_parts(parts: &[u32]) -> Self {
        let raw = parts.iter().map(ToString::to_string).collect::<Vec<_>>().join(".");
        Self { parts: parts.to_vec(), raw }
    }

    /// The version string as reported by the tool.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for ToolVersion {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = Vec::new();
        for component in s.split('.') {
            let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
            if digits.is_empty() {
                break;
            }
            parts.push(digits.parse()?);
            // Stop at components with trailing text ("19+htslib" ends the run).
            if digits.len() != component.len() {
                break;
            }
        }
        Ok(Self { parts, raw: s.to_string() })
    }
}

impl PartialOrd for ToolVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ToolVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}
