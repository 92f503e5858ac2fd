//! Input validation utilities
//!
//! Common validation functions for command-line parameters and file paths
//! with consistent error messages. Validation failures use the structured
//! error types from [`crate::errors`].

use crate::errors::{Result, VcallError};
use std::path::Path;

/// Validate that a file exists
///
/// # Arguments
/// * `path` - Path to validate
/// * `description` - Human-readable description of the file (e.g., "Input BAM", "Reference")
///
/// # Errors
/// Returns an error if the file does not exist
///
/// # Example
/// ```
/// use vcall_lib::validation::validate_file_exists;
///
/// let result = validate_file_exists("/nonexistent/file.bam", "Input BAM");
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists<P: AsRef<Path>>(path: P, description: &str) -> Result<()> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        return Err(VcallError::MissingFile {
            path: path_ref.display().to_string(),
            context: description.to_string(),
        });
    }
    Ok(())
}

/// Validate that multiple files exist
///
/// # Errors
/// Returns an error for the first file that doesn't exist
pub fn validate_files_exist<P: AsRef<Path>>(files: &[(P, &str)]) -> Result<()> {
    for (path, desc) in files {
        validate_file_exists(path, desc)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_file_exists_ok() {
        let file = NamedTempFile::new().unwrap();
        assert!(validate_file_exists(file.path(), "Test file").is_ok());
    }

    #[test]
    fn test_validate_file_exists_missing() {
        let result = validate_file_exists("/no/such/file.vcf", "Variant file");
        let err = result.unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Variant file"));
        assert!(msg.contains("/no/such/file.vcf"));
    }

    #[test]
    fn test_validate_files_exist_first_failure() {
        let file = NamedTempFile::new().unwrap();
        let files = vec![(file.path().to_path_buf(), "First"), ("/missing.bam".into(), "Second")];
        assert!(validate_files_exist(&files).is_err());
    }
}
