//! Narrow filesystem interface: directory creation, extension handling,
//! sidecar-aware copy/symlink, and transactional output publication.
//!
//! Every file-producing step in the pipeline writes through
//! [`file_transaction`], so partially written outputs never land at their
//! final path and idempotent re-invocation stays safe.

use crate::errors::{Result, VcallError};
use std::fs;
use std::path::{Path, PathBuf};

/// Compressed-container extensions that stack on top of a format extension.
const STACKED_EXTS: [&str; 3] = ["gz", "bz2", "zip"];

/// Index sidecars copied or linked along with their data file.
const SIDECAR_EXTS: [&str; 3] = ["tbi", "csi", "bai"];

/// Creates a directory (and parents) if needed, returning the path.
///
/// # Errors
/// Returns an error when the directory cannot be created.
pub fn safe_makedir(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        fs::create_dir_all(dir).map_err(|e| VcallError::io(dir.display().to_string(), e))?;
    }
    Ok(dir.to_path_buf())
}

/// Splits a path into a stem and its full extension, keeping stacked
/// compression extensions together (`sample.vcf.gz` -> `("sample", ".vcf.gz")`).
#[must_use]
pub fn splitext_plus(path: &Path) -> (String, String) {
    let path_str = path.to_string_lossy().to_string();
    let Some(ext) = path.extension().map(|e| e.to_string_lossy().to_string()) else {
        return (path_str, String::new());
    };
    let mut stem = path_str[..path_str.len() - ext.len() - 1].to_string();
    let mut full_ext = format!(".{ext}");
    if STACKED_EXTS.contains(&ext.as_str()) {
        if let Some(inner) = Path::new(&stem).extension().map(|e| e.to_string_lossy().to_string())
        {
            full_ext = format!(".{inner}{full_ext}");
            stem.truncate(stem.len() - inner.len() - 1);
        }
    }
    (stem, full_ext)
}

/// Copies a file along with any index sidecars sitting next to it.
///
/// # Errors
/// Returns an error when the primary copy fails; missing sidecars are skipped.
pub fn copy_plus(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst).map_err(|e| VcallError::io(src.display().to_string(), e))?;
    for ext in SIDECAR_EXTS {
        let src_idx = sidecar_path(src, ext);
        if src_idx.exists() {
            let dst_idx = sidecar_path(dst, ext);
            fs::copy(&src_idx, &dst_idx)
                .map_err(|e| VcallError::io(src_idx.display().to_string(), e))?;
        }
    }
    Ok(())
}

/// Symlinks a file (and index sidecars) to a new location, falling back to a
/// copy on platforms without symlinks. Existing destinations are left alone.
///
/// # Errors
/// Returns an error when neither a link nor a copy can be created.
pub fn symlink_plus(src: &Path, dst: &Path) -> Result<()> {
    link_or_copy(src, dst)?;
    for ext in SIDECAR_EXTS {
        let src_idx = sidecar_path(src, ext);
        if src_idx.exists() {
            link_or_copy(&src_idx, &sidecar_path(dst, ext))?;
        }
    }
    Ok(())
}

fn sidecar_path(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(format!(".{ext}"));
    PathBuf::from(s)
}

fn link_or_copy(src: &Path, dst: &Path) -> Result<()> {
    if dst.exists() || dst.symlink_metadata().is_ok() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(src, dst)
            .map_err(|e| VcallError::io(dst.display().to_string(), e))?;
    }
    #[cfg(not(unix))]
    {
        fs::copy(src, dst).map_err(|e| VcallError::io(dst.display().to_string(), e))?;
    }
    Ok(())
}

/// Runs `write_fn` against a temporary path and publishes the result at
/// `out_file` only on success.
///
/// The temporary file lives in the destination directory so the final rename
/// stays on one filesystem. On error the temporary directory is cleaned up
/// and `out_file` is untouched.
///
/// # Errors
/// Propagates errors from `write_fn` and from the final rename.
pub fn file_transaction<F>(out_file: &Path, write_fn: F) -> anyhow::Result<()>
where
    F: FnOnce(&Path) -> anyhow::Result<()>,
{
    let out_dir = out_file.parent().unwrap_or_else(|| Path::new("."));
    safe_makedir(out_dir)?;
    let tx_dir = tempfile::Builder::new().prefix("tx").tempdir_in(out_dir)?;
    let file_name = out_file
        .file_name()
        .ok_or_else(|| VcallError::io(out_file.display().to_string(), std::io::Error::other("output path has no file name")))?;
    let tx_path = tx_dir.path().join(file_name);
    write_fn(&tx_path)?;
    fs::rename(&tx_path, out_file)
        .map_err(|e| VcallError::io(out_file.display().to_string(), e))?;
    // Sidecars produced alongside the transactional output move with it.
    for ext in SIDECAR_EXTS {
        let tx_idx = sidecar_path(&tx_path, ext);
        if tx_idx.exists() {
            fs::rename(&tx_idx, sidecar_path(out_file, ext))
                .map_err(|e| VcallError::io(tx_idx.display().to_string(), e))?;
        }
    }
    Ok(())
}
