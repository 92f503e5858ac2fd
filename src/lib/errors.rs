//! Custom error types for vcall operations.

use thiserror::Error;

/// Result type alias for vcall operations
pub type Result<T> = std::result::Result<T, VcallError>;

/// Error type for vcall operations
#[derive(Error, Debug)]
pub enum VcallError {
    /// Invalid pipeline configuration
    #[error("Invalid configuration for sample '{sample}': {reason}")]
    InvalidConfig {
        /// Sample the configuration belongs to
        sample: String,
        /// Explanation of what is wrong
        reason: String,
    },

    /// A caller identifier outside the recognized domain
    #[error("Unknown variant caller '{name}'")]
    UnknownCaller {
        /// The unrecognized caller name
        name: String,
    },

    /// A recognized caller with no built-in implementation
    #[error("Variant caller '{name}' is recognized but not built into this binary")]
    CallerNotBuilt {
        /// The caller name
        name: String,
    },

    /// A required input file is absent
    #[error("{context}: file does not exist: {path}")]
    MissingFile {
        /// Path that was expected on disk
        path: String,
        /// What the file was needed for
        context: String,
    },

    /// Internal pipeline state violated an expected precondition
    #[error("Precondition failed for sample '{sample}': {reason}")]
    Precondition {
        /// Sample being processed
        sample: String,
        /// The violated expectation
        reason: String,
    },

    /// External tool version below the supported floor
    #[error("{tool} version {found} is not supported (requires > {minimum})")]
    UnsupportedToolVersion {
        /// Tool name
        tool: String,
        /// Version detected on the system
        found: String,
        /// Oldest supported version
        minimum: String,
    },

    /// External tool invocation failed
    #[error("{tool} failed during {context}: {detail}")]
    ToolFailed {
        /// Tool name
        tool: String,
        /// The operation being performed (sample/caller/region)
        context: String,
        /// Exit status or spawn error
        detail: String,
    },

    /// Wrapped I/O error with the path involved
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path involved in the failed operation
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl VcallError {
    /// Attach a path to a raw I/O error.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_display() {
        let error = VcallError::InvalidConfig {
            sample: "S1".to_string(),
            reason: "multiple precalled variant files".to_string(),
        };
        let msg = format!("{error}");
        assert!(msg.contains("'S1'"));
        assert!(msg.contains("multiple precalled variant files"));
    }

    #[test]
    fn test_unknown_caller_display() {
        let error = VcallError::UnknownCaller { name: "mystery".to_string() };
        assert_eq!(format!("{error}"), "Unknown variant caller 'mystery'");
    }

    #[test]
    fn test_unsupported_version_display() {
        let error = VcallError::UnsupportedToolVersion {
            tool: "samtools".to_string(),
            found: "0.1.18".to_string(),
            minimum: "0.1.19".to_string(),
        };
        let msg = format!("{error}");
        assert!(msg.contains("samtools"));
        assert!(msg.contains("0.1.18"));
    }

    #[test]
    fn test_missing_file_display() {
        let error = VcallError::MissingFile {
            path: "/data/x.bam".to_string(),
            context: "Region input BAM".to_string(),
        };
        let msg = format!("{error}");
        assert!(msg.contains("/data/x.bam"));
        assert!(msg.contains("Region input BAM"));
    }
}
