use mill_css_ast::CssError;
use mill_foundation::UpgradeError;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CodemodError {
    /// `migrate` needs a file to attribute its work to
    #[error("Cannot migrate a stylesheet without a file")]
    MissingFile,

    #[error("Codemod `{codemod}` failed: {message}")]
    Failed {
        codemod: &'static str,
        message: String,
    },

    #[error(transparent)]
    Parse(#[from] CssError),
}

impl CodemodError {
    pub fn failed(codemod: &'static str, message: impl Into<String>) -> Self {
        Self::Failed {
            codemod,
            message: message.into(),
        }
    }
}

pub type CodemodResult<T> = Result<T, CodemodError>;

impl From<CodemodError> for UpgradeError {
    fn from(err: CodemodError) -> Self {
        match err {
            CodemodError::MissingFile => {
                UpgradeError::config(CodemodError::MissingFile.to_string())
            }
            CodemodError::Failed { codemod, message } => UpgradeError::codemod(codemod, message),
            CodemodError::Parse(parse) => UpgradeError::parse(parse.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_is_a_config_error() {
        let err: UpgradeError = CodemodError::MissingFile.into();
        assert_eq!(err.code(), mill_foundation::error_codes::E2001_CONFIG);
    }

    #[test]
    fn test_failed_keeps_codemod_id() {
        let err: UpgradeError = CodemodError::failed("format-nodes", "detached root").into();
        assert_eq!(err.to_string(), "Codemod `format-nodes` failed: detached root");
    }
}
