use std::path::PathBuf;
use thiserror::Error;

/// A specialized `Result` type for skill-trigger operations.
pub type SkillResult<T> = Result<T, SkillError>;

/// The error type for matching, capture, input and persistence operations.
#[derive(Debug, Error)]
pub enum SkillError {
    #[error("Invalid image input: {description}")]
    InvalidInput { description: String },

    #[error("Hash shapes differ: {left}x{left} vs {right}x{right}")]
    ShapeMismatch { left: usize, right: usize },

    #[error("Screen capture failed: {description}")]
    CaptureFailed { description: String },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode or decode image {path:?}: {source}")]
    ImageCodec {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Malformed profile file {path:?}: {source}")]
    ProfileFormat {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Profile '{name}' does not exist")]
    ProfileNotFound { name: String },

    #[error("Key press '{key}' failed: {description}")]
    InputInjectionFailed { key: String, description: String },

    #[error("A template with id '{id}' is already bound")]
    DuplicateTemplate { id: String },

    #[error("Invalid monitor region: {description}")]
    InvalidRegion { description: String },

    #[error("Invalid settings: {description}")]
    InvalidSettings { description: String },

    #[error("Unrecognized key spec '{spec}'")]
    InvalidKeySpec { spec: String },

    #[error("Detection task failed to complete: {source}")]
    JoinError {
        #[from]
        source: tokio::task::JoinError,
    },
}

impl SkillError {
    /// True for errors raised while reading or writing profiles and templates
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            SkillError::Io { .. }
                | SkillError::ImageCodec { .. }
                | SkillError::ProfileFormat { .. }
                | SkillError::ProfileNotFound { .. }
        )
    }

    /// True for capture/input errors the detection loop reports and survives
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            SkillError::CaptureFailed { .. } | SkillError::InputInjectionFailed { .. }
        )
    }

    pub fn invalid_input(description: impl Into<String>) -> Self {
        SkillError::InvalidInput {
            description: description.into(),
        }
    }

    pub fn capture_failed(description: impl Into<String>) -> Self {
        SkillError::CaptureFailed {
            description: description.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_families() {
        let io = SkillError::Io {
            path: PathBuf::from("x.json"),
            source: std::io::Error::other("disk full"),
        };
        assert!(io.is_persistence());
        assert!(!io.is_operational());

        let capture = SkillError::capture_failed("no frames");
        assert!(capture.is_operational());
        assert!(!capture.is_persistence());

        let shape = SkillError::ShapeMismatch { left: 16, right: 8 };
        assert!(!shape.is_operational());
        assert_eq!(shape.to_string(), "Hash shapes differ: 16x16 vs 8x8");
    }
}
