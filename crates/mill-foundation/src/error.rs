//! Error handling shared by every stage of the stylesheet upgrade

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for one stylesheet graph.
///
/// Stage crates keep their own error enums and convert into this one at the
/// boundary, so a batch run can report every failed graph uniformly.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UpgradeError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Import resolution failed: {message}")]
    Resolve { message: String },

    #[error("Codemod `{codemod}` failed: {message}")]
    Codemod { codemod: String, message: String },

    #[error("Split target already exists: {}", path.display())]
    SplitCollision { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl UpgradeError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn resolve(message: impl Into<String>) -> Self {
        Self::Resolve {
            message: message.into(),
        }
    }

    pub fn codemod(codemod: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Codemod {
            codemod: codemod.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable code for reports
    pub fn code(&self) -> &'static str {
        use error_codes::*;

        match self {
            Self::Config { .. } => E2001_CONFIG,
            Self::Parse { .. } => E2002_PARSE,
            Self::Resolve { .. } => E2003_RESOLVE,
            Self::Codemod { .. } => E2004_CODEMOD,
            Self::SplitCollision { .. } => E2005_SPLIT_COLLISION,
            Self::Io(_) => E2006_IO,
            Self::Internal { .. } => E2000_INTERNAL,
        }
    }
}

/// Result type alias for convenience
pub type UpgradeResult<T> = Result<T, UpgradeError>;

pub mod error_codes {
    pub const E2000_INTERNAL: &str = "E2000";
    pub const E2001_CONFIG: &str = "E2001";
    pub const E2002_PARSE: &str = "E2002";
    pub const E2003_RESOLVE: &str = "E2003";
    pub const E2004_CODEMOD: &str = "E2004";
    pub const E2005_SPLIT_COLLISION: &str = "E2005";
    pub const E2006_IO: &str = "E2006";
}

/// Serializable form of a failure, used in batch reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
}

impl From<&UpgradeError> for ErrorReport {
    fn from(err: &UpgradeError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            UpgradeError::config("stylesheet has no file").to_string(),
            "Configuration error: stylesheet has no file"
        );
        assert_eq!(
            UpgradeError::codemod("format-nodes", "boom").to_string(),
            "Codemod `format-nodes` failed: boom"
        );
        assert_eq!(
            UpgradeError::SplitCollision {
                path: PathBuf::from("/p/b.utilities.css")
            }
            .to_string(),
            "Split target already exists: /p/b.utilities.css"
        );
    }

    #[test]
    fn test_report_carries_code() {
        let err = UpgradeError::resolve("missing /p/x.css");
        let report = ErrorReport::from(&err);
        assert_eq!(report.code, "E2003");
        assert_eq!(report.message, "Import resolution failed: missing /p/x.css");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: UpgradeError = io.into();
        assert_eq!(err.code(), error_codes::E2006_IO);
    }
}
