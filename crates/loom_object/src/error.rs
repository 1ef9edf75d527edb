//! Error types for the unit codec.
//!
//! These are the only recoverable failures in the substrate: they describe
//! bad external data (a truncated or corrupted unit, a dependency that cannot
//! be found) and are reported to the user by the driver. Schema misuse by a
//! compiler pass is not an error value; see [`fatal`](crate::fatal).

/// Errors that can occur while reading or writing a unit.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// An I/O error occurred on the underlying sink or source.
    #[error("unit I/O error in {context}: {source}")]
    Io {
        /// What was being read or written (a file path or `"stream"`).
        context: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The unit does not start with a valid header.
    #[error("invalid unit header: {reason}")]
    InvalidHeader {
        /// Description of the header problem.
        reason: String,
    },

    /// The unit was written by an incompatible format version.
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The format version this build reads.
        expected: u32,
        /// The format version found in the header.
        actual: u32,
    },

    /// The payload does not hash to the checksum in the header.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The checksum recorded in the header.
        expected: String,
        /// The checksum computed from the payload.
        actual: String,
    },

    /// The payload decoded but does not describe a well-formed unit.
    #[error("malformed unit {unit}: {reason}")]
    Malformed {
        /// Key of the unit being read.
        unit: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The root object does not belong to the class the caller asked for.
    #[error("class mismatch: expected a {expected} object, found {actual}")]
    TagMismatch {
        /// Name of the expected class.
        expected: String,
        /// Name of the class actually found.
        actual: String,
    },

    /// The resolver could not supply a unit this one depends on.
    #[error("unresolved dependency {key}: {reason}")]
    UnresolvedDependency {
        /// Key of the missing unit.
        key: String,
        /// Why it could not be resolved.
        reason: String,
    },

    /// A dependency resolved to a unit whose content differs from the one
    /// this unit was written against.
    #[error("dependency {key} changed: expected {expected}, got {actual}")]
    DependencyChecksum {
        /// Key of the dependency.
        key: String,
        /// Checksum recorded when this unit was written.
        expected: String,
        /// Checksum of the unit the resolver supplied.
        actual: String,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

impl CodecError {
    pub(crate) fn stream(source: std::io::Error) -> Self {
        CodecError::Io {
            context: "stream".to_string(),
            source,
        }
    }

    pub(crate) fn malformed(unit: &str, reason: impl Into<String>) -> Self {
        CodecError::Malformed {
            unit: unit.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = CodecError::Io {
            context: "work/top.unit".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("unit I/O error"));
        assert!(msg.contains("top.unit"));
    }

    #[test]
    fn version_mismatch_display() {
        let err = CodecError::VersionMismatch {
            expected: 2,
            actual: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("expected 2"));
        assert!(msg.contains("got 1"));
    }

    #[test]
    fn malformed_display() {
        let err = CodecError::malformed("top", "object 3 has unknown kind 900");
        let msg = err.to_string();
        assert!(msg.contains("malformed unit top"));
        assert!(msg.contains("unknown kind 900"));
    }

    #[test]
    fn dependency_display() {
        let err = CodecError::UnresolvedDependency {
            key: "ieee.std_logic_1164".to_string(),
            reason: "not in library".to_string(),
        };
        assert!(err.to_string().contains("ieee.std_logic_1164"));

        let err = CodecError::DependencyChecksum {
            key: "pkg".to_string(),
            expected: "aa".to_string(),
            actual: "bb".to_string(),
        };
        assert!(err.to_string().contains("dependency pkg changed"));
    }

    #[test]
    fn tag_mismatch_display() {
        let err = CodecError::TagMismatch {
            expected: "tree".to_string(),
            actual: "type".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "class mismatch: expected a tree object, found type"
        );
    }
}
