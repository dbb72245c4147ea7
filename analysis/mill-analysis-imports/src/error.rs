//! Error types for loading stylesheets and analyzing their imports

use mill_css_ast::CssError;
use mill_foundation::UpgradeError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the import-flattening resolver. Always fatal for the graph.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("Imported file not found: {} (imported from {importer})", path.display())]
    NotFound { path: PathBuf, importer: String },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse { path: PathBuf, source: CssError },
}

/// Failures while reading a stylesheet into memory
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LoadError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] CssError),
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AnalysisError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

impl From<ResolveError> for UpgradeError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Parse { .. } => UpgradeError::parse(err.to_string()),
            _ => UpgradeError::resolve(err.to_string()),
        }
    }
}

impl From<AnalysisError> for UpgradeError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Resolve(inner) => inner.into(),
        }
    }
}

impl From<LoadError> for UpgradeError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Io { path, source } => UpgradeError::Io(std::io::Error::new(
                source.kind(),
                format!("{}: {}", path.display(), source),
            )),
            LoadError::Parse(parse) => UpgradeError::parse(parse.to_string()),
        }
    }
}
