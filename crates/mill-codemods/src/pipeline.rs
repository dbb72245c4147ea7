//! Running the codemods over stylesheets

use crate::codemods::{default_codemods, Codemod};
use crate::error::{CodemodError, CodemodResult};
use mill_analysis_imports::Stylesheet;
use serde::Serialize;

/// What one codemod did to one sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodemodRun {
    pub codemod: &'static str,
    pub changes: usize,
}

pub struct Pipeline {
    codemods: Vec<Box<dyn Codemod>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(default_codemods())
    }
}

impl Pipeline {
    pub fn new(codemods: Vec<Box<dyn Codemod>>) -> Self {
        Self { codemods }
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.codemods.iter().map(|codemod| codemod.id()).collect()
    }

    /// Apply every codemod in order, stopping at the first failure
    pub fn run(&self, sheet: &mut Stylesheet) -> CodemodResult<Vec<CodemodRun>> {
        let mut runs = Vec::with_capacity(self.codemods.len());
        for codemod in &self.codemods {
            let changes = codemod.apply(sheet)?;
            if changes > 0 {
                tracing::debug!(
                    codemod = codemod.id(),
                    sheet = %sheet.display_name(),
                    changes,
                    "Applied codemod"
                );
            }
            runs.push(CodemodRun {
                codemod: codemod.id(),
                changes,
            });
        }
        Ok(runs)
    }
}

/// Run the default pipeline on a sheet loaded from a file
pub fn migrate(sheet: &mut Stylesheet) -> CodemodResult<Vec<CodemodRun>> {
    if sheet.file.is_none() {
        return Err(CodemodError::MissingFile);
    }
    Pipeline::default().run(sheet)
}

/// Run the default pipeline on raw stylesheet text and return the migrated text
pub fn migrate_contents(contents: &str) -> CodemodResult<String> {
    let mut sheet = Stylesheet::parse(contents, None)?;
    Pipeline::default().run(&mut sheet)?;
    Ok(sheet.content())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_pipeline_order() {
        assert_eq!(
            Pipeline::default().ids(),
            vec![
                "migrate-at-apply",
                "migrate-at-layer-utilities",
                "migrate-missing-layers",
                "migrate-tailwind-directives",
                "format-nodes",
            ]
        );
    }

    #[test]
    fn test_migrate_requires_file() {
        let mut sheet = Stylesheet::parse(".a {}", None).unwrap();
        assert!(matches!(migrate(&mut sheet), Err(CodemodError::MissingFile)));

        let mut sheet = Stylesheet::parse(".a {}", Some(PathBuf::from("/p/a.css"))).unwrap();
        let runs = migrate(&mut sheet).unwrap();
        assert!(runs.iter().all(|run| run.changes == 0));
        assert_eq!(sheet.content(), ".a {}");
    }

    #[test]
    fn test_migrate_contents_parse_error() {
        assert!(matches!(
            migrate_contents(".a {"),
            Err(CodemodError::Parse(_))
        ));
    }
}
