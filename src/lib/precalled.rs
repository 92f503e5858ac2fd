//! Handling of externally supplied (precalled) variants.
//!
//! When a sample arrives with a variant file and no caller configured, the
//! pipeline skips calling entirely and stages the supplied file inside the
//! working directory so downstream steps see a pipeline-owned path.

use crate::errors::{Result, VcallError};
use crate::fsutil;
use crate::sample::{Sample, VrnFile};
use log::info;
use std::path::Path;

/// Copies externally supplied variants into `<work>/precalled/` and records
/// the staged path as the sample's working variant file.
///
/// Samples without a `vrn_file` pass through unchanged. A sequence-valued
/// `vrn_file` must contain exactly one path; anything else is a
/// configuration error.
///
/// # Errors
/// Returns an error for multi-file input, a missing source file, or a failed
/// copy.
pub fn handle_precalled(mut data: Sample) -> Result<Sample> {
    let Some(vrn_file) = &data.vrn_file else {
        return Ok(data);
    };
    let source = match vrn_file {
        VrnFile::One(path) => path.clone(),
        VrnFile::Many(paths) => {
            if paths.len() != 1 {
                return Err(VcallError::InvalidConfig {
                    sample: data.description.clone(),
                    reason: format!(
                        "expected exactly one precalled variant file, found {}",
                        paths.len()
                    ),
                });
            }
            paths[0].clone()
        }
    };
    if !source.exists() {
        return Err(VcallError::MissingFile {
            path: source.display().to_string(),
            context: format!("Precalled variant file for sample '{}'", data.description),
        });
    }
    let precalled_dir = fsutil::safe_makedir(&data.dirs.work.join("precalled"))?;
    let (_, ext) = fsutil::splitext_plus(&source);
    let staged = precalled_dir.join(format!("{}-precalled{ext}", data.description));
    if !staged.exists() {
        info!(
            "Staging precalled variants for sample '{}': {}",
            data.description,
            source.display()
        );
        let absolute = absolutize(&source)?;
        fsutil::copy_plus(&absolute, &staged)?;
    }
    data.vrn_file = Some(VrnFile::One(staged));
    Ok(data)
}

fn absolutize(path: &Path) -> Result<std::path::PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .map_err(|e| VcallError::io(path.display().to_string(), e))
    }
}
