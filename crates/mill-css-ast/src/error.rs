//! CSS parse error types

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Position of a parse failure, rendered as `file:line:column`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: Option<PathBuf>,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub(crate) fn new(file: Option<&Path>, line: usize, column: usize) -> Self {
        Self {
            file: file.map(Path::to_path_buf),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file.display(), self.line, self.column),
            None => write!(f, "<input>:{}:{}", self.line, self.column),
        }
    }
}

/// Errors produced while parsing stylesheet text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CssError {
    #[error("{location}: unclosed block")]
    UnclosedBlock { location: Location },

    #[error("{location}: unclosed comment")]
    UnclosedComment { location: Location },

    #[error("{location}: unclosed string")]
    UnclosedString { location: Location },

    #[error("{location}: unexpected `}}`")]
    UnexpectedClose { location: Location },
}

impl CssError {
    pub fn location(&self) -> &Location {
        match self {
            Self::UnclosedBlock { location }
            | Self::UnclosedComment { location }
            | Self::UnclosedString { location }
            | Self::UnexpectedClose { location } => location,
        }
    }
}

/// Result type alias for CSS tree operations
pub type CssResult<T> = Result<T, CssError>;
