use super::Codemod;
use crate::error::CodemodResult;
use mill_analysis_imports::Stylesheet;
use mill_css_ast::{AtRule, NodeId, NodeKind, Tree};

/// `@tailwind` directives become `@import`s of the framework entry points
pub struct MigrateTailwindDirectives;

impl Codemod for MigrateTailwindDirectives {
    fn id(&self) -> &'static str {
        "migrate-tailwind-directives"
    }

    fn apply(&self, sheet: &mut Stylesheet) -> CodemodResult<usize> {
        let tree = &mut sheet.tree;
        let root = tree.root();
        let directives: Vec<(NodeId, String)> = tree
            .children(root)
            .iter()
            .filter_map(|node| {
                let at_rule = tree.at_rule(*node)?;
                at_rule
                    .name
                    .eq_ignore_ascii_case("tailwind")
                    .then(|| (*node, at_rule.params.trim().to_ascii_lowercase()))
            })
            .collect();

        let has = |layer: &str| directives.iter().any(|(_, params)| params == layer);
        if has("base") && has("components") && has("utilities") {
            let mut first = true;
            for (node, params) in &directives {
                if !matches!(params.as_str(), "base" | "components" | "utilities") {
                    continue;
                }
                if first {
                    replace_with_imports(tree, *node, &["\"tailwindcss\""]);
                    first = false;
                } else {
                    tree.remove(*node);
                }
            }
            tracing::debug!("Collapsed @tailwind directives into a single import");
            return Ok(3);
        }

        let mut changed = 0;
        for (node, params) in &directives {
            match params.as_str() {
                "base" => replace_with_imports(
                    tree,
                    *node,
                    &[
                        "\"tailwindcss/theme\" layer(theme)",
                        "\"tailwindcss/preflight\" layer(base)",
                    ],
                ),
                "utilities" => replace_with_imports(
                    tree,
                    *node,
                    &["\"tailwindcss/utilities\" layer(utilities)"],
                ),
                "components" => tree.remove(*node),
                _ => continue,
            }
            changed += 1;
        }
        Ok(changed)
    }
}

/// Replace `node` with one `@import` per params string, keeping its leading whitespace
fn replace_with_imports(tree: &mut Tree, node: NodeId, imports: &[&str]) {
    let before = tree.get(node).raws.before.clone();
    let mut anchor = node;
    for (index, params) in imports.iter().enumerate() {
        let import = tree.create(NodeKind::AtRule(AtRule::statement("import", *params)));
        let data = tree.get_mut(import);
        data.raws.semicolon = true;
        if index == 0 {
            data.raws.before = before.clone();
        }
        tree.insert_after(anchor, import);
        anchor = import;
    }
    tree.remove(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(css: &str) -> String {
        let mut sheet = Stylesheet::parse(css, None).unwrap();
        MigrateTailwindDirectives.apply(&mut sheet).unwrap();
        sheet.content()
    }

    #[test]
    fn test_all_three_collapse() {
        assert_eq!(
            run("/* app */\n@tailwind base;\n@tailwind components;\n@tailwind utilities;\n"),
            "/* app */\n@import \"tailwindcss\";\n"
        );
    }

    #[test]
    fn test_individual_directives() {
        assert_eq!(
            run("@tailwind base;\n.a{}\n@tailwind utilities;"),
            "@import \"tailwindcss/theme\" layer(theme);@import \"tailwindcss/preflight\" layer(base);\n.a{}\n@import \"tailwindcss/utilities\" layer(utilities);"
        );
        assert_eq!(run("@tailwind components;\n.a{}"), "\n.a{}");
    }

    #[test]
    fn test_other_directives_untouched() {
        let css = "@tailwind variants;\n";
        assert_eq!(run(css), css);
    }
}
