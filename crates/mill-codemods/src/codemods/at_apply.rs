use super::Codemod;
use crate::error::{CodemodError, CodemodResult};
use mill_analysis_imports::Stylesheet;
use once_cell::sync::Lazy;
use regex::Regex;

static CANDIDATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").unwrap());

/// `@apply !flex hover:!underline` → `@apply flex! hover:underline!`
pub struct MigrateAtApply;

impl Codemod for MigrateAtApply {
    fn id(&self) -> &'static str {
        "migrate-at-apply"
    }

    fn apply(&self, sheet: &mut Stylesheet) -> CodemodResult<usize> {
        let mut changed = 0;
        for id in sheet.tree.at_rules("apply") {
            let Some(params) = sheet.tree.at_rule(id).map(|at_rule| at_rule.params.clone()) else {
                continue;
            };
            let migrated = migrate_candidates(&params)?;
            if migrated != params {
                tracing::debug!(before = %params, after = %migrated, "Moved important marker");
                sheet.tree.set_params(id, migrated);
                changed += 1;
            }
        }
        Ok(changed)
    }
}

fn migrate_candidates(params: &str) -> CodemodResult<String> {
    let mut error = None;
    let migrated = CANDIDATE.replace_all(params, |caps: &regex::Captures| {
        let candidate = &caps[0];
        match migrate_candidate(candidate) {
            Ok(migrated) => migrated,
            Err(err) => {
                error.get_or_insert(err);
                candidate.to_string()
            }
        }
    });
    match error {
        Some(err) => Err(err),
        None => Ok(migrated.into_owned()),
    }
}

fn migrate_candidate(candidate: &str) -> CodemodResult<String> {
    if candidate.eq_ignore_ascii_case("!important") {
        return Ok(candidate.to_string());
    }
    let base = base_start(candidate).ok_or_else(|| {
        CodemodError::failed(
            "migrate-at-apply",
            format!("unbalanced brackets in candidate `{candidate}`"),
        )
    })?;
    let (variants, utility) = candidate.split_at(base);
    let Some(utility) = utility.strip_prefix('!') else {
        return Ok(candidate.to_string());
    };
    if utility.ends_with('!') {
        return Ok(format!("{variants}{utility}"));
    }
    Ok(format!("{variants}{utility}!"))
}

/// Byte offset just past the last variant separator outside `[...]` / `(...)`
fn base_start(candidate: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in candidate.char_indices() {
        match ch {
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.checked_sub(1)?,
            ':' if depth == 0 => start = idx + 1,
            _ => {}
        }
    }
    (depth == 0).then_some(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(css: &str) -> String {
        let mut sheet = Stylesheet::parse(css, None).unwrap();
        MigrateAtApply.apply(&mut sheet).unwrap();
        sheet.content()
    }

    #[test]
    fn test_moves_leading_important() {
        assert_eq!(
            run(".a { @apply !flex  hover:!underline md:[&>*]:!p-4 !important; }"),
            ".a { @apply flex!  hover:underline! md:[&>*]:p-4! !important; }"
        );
    }

    #[test]
    fn test_leaves_other_candidates() {
        let css = ".a {\n  @apply flex text-[color:red] group-hover:bg-white;\n}\n";
        assert_eq!(run(css), css);
    }

    #[test]
    fn test_already_suffixed() {
        assert_eq!(run(".a{@apply !flex!}"), ".a{@apply flex!}");
    }

    #[test]
    fn test_unbalanced_brackets_fail() {
        let mut sheet = Stylesheet::parse(".a{@apply !bg-red];}", None).unwrap();
        let err = MigrateAtApply.apply(&mut sheet).unwrap_err();
        assert!(matches!(
            err,
            CodemodError::Failed {
                codemod: "migrate-at-apply",
                ..
            }
        ));
    }
}
