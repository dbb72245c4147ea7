use super::{is_layer_block, Codemod};
use crate::error::CodemodResult;
use mill_analysis_imports::Stylesheet;
use mill_css_ast::{AtRule, NodeId, NodeKind, Tree};
use once_cell::sync::Lazy;
use regex::Regex;

/// `.name` with optional escapes, and nothing else
static SINGLE_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\.((?:[A-Za-z0-9_-]|\\.)+)$").unwrap());

const UTILITY_LAYERS: [&str; 2] = ["utilities", "components"];

/// Single-class rules in utility layers become `@utility` rules.
///
/// Rules inside `@layer utilities` / `@layer components` are hoisted out in
/// front of the layer block, which is dropped once empty. When the sheet itself
/// was imported into one of those layers its top-level rules convert in place.
pub struct MigrateAtLayerUtilities;

impl Codemod for MigrateAtLayerUtilities {
    fn id(&self) -> &'static str {
        "migrate-at-layer-utilities"
    }

    fn apply(&self, sheet: &mut Stylesheet) -> CodemodResult<usize> {
        let imported_into_layer = UTILITY_LAYERS.iter().any(|layer| sheet.has_layer(layer));
        let tree = &mut sheet.tree;
        let root = tree.root();
        let mut changed = 0;

        for node in tree.children(root).to_vec() {
            if UTILITY_LAYERS
                .iter()
                .any(|layer| is_layer_block(tree, node, layer))
            {
                for child in tree.children(node).to_vec() {
                    if let Some(utility) = to_utility(tree, child) {
                        tree.insert_before(node, utility);
                        tree.remove(child);
                        changed += 1;
                    }
                }
                if tree.children(node).is_empty() {
                    tracing::debug!("Removing empty @layer block");
                    tree.remove(node);
                }
            } else if imported_into_layer {
                if let Some(utility) = to_utility(tree, node) {
                    tree.replace(node, utility);
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }
}

/// Build a detached `@utility` equivalent of `rule` and move its body over
fn to_utility(tree: &mut Tree, rule: NodeId) -> Option<NodeId> {
    let selector = tree.get(rule).as_rule()?.selector.trim().to_string();
    let name = utility_name(&selector)?;

    let utility = tree.create(NodeKind::AtRule(AtRule::block("utility", name.as_str())));
    let raws = tree.get(rule).raws.clone();
    let data = tree.get_mut(utility);
    data.raws.before = raws.before;
    data.raws.between = raws.between;
    data.raws.after = raws.after;
    for child in tree.children(rule).to_vec() {
        tree.append(utility, child);
    }
    tracing::trace!(selector = %selector, utility = %name, "Converted rule to @utility");
    Some(utility)
}

fn utility_name(selector: &str) -> Option<String> {
    let caps = SINGLE_CLASS.captures(selector)?;
    Some(caps[1].replace('\\', ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(css: &str, layers: &[&str]) -> (String, usize) {
        let mut sheet = Stylesheet::parse(css, None).unwrap();
        sheet.layers = layers.iter().map(|layer| layer.to_string()).collect();
        let changed = MigrateAtLayerUtilities.apply(&mut sheet).unwrap();
        (sheet.content(), changed)
    }

    #[test]
    fn test_utility_name() {
        assert_eq!(utility_name(".tab-4").as_deref(), Some("tab-4"));
        assert_eq!(utility_name(".w-1\\/2").as_deref(), Some("w-1/2"));
        assert_eq!(utility_name(".a.b"), None);
        assert_eq!(utility_name(".a:hover"), None);
        assert_eq!(utility_name("h1"), None);
        assert_eq!(utility_name(".a, .b"), None);
    }

    #[test]
    fn test_hoists_out_of_layer_block() {
        let (css, changed) = run(
            "@layer utilities {\n  .tab-4 {\n    tab-size: 4;\n  }\n}\n",
            &[],
        );
        assert_eq!(changed, 1);
        assert_eq!(css, "\n  @utility tab-4 {\n    tab-size: 4;\n  }\n");
    }

    #[test]
    fn test_keeps_layer_with_other_rules() {
        let (css, changed) = run(
            "@layer components {\n  .btn { color: red }\n  .card > p { margin: 0 }\n}",
            &[],
        );
        assert_eq!(changed, 1);
        assert_eq!(
            css,
            "\n  @utility btn { color: red }@layer components {\n  .card > p { margin: 0 }\n}"
        );
    }

    #[test]
    fn test_top_level_rules_when_imported_into_layer() {
        let (css, changed) = run(".btn { color: red }\nh1 { margin: 0 }\n", &["utilities"]);
        assert_eq!(changed, 1);
        assert_eq!(css, "@utility btn { color: red }\nh1 { margin: 0 }\n");
    }

    #[test]
    fn test_ignores_top_level_rules_elsewhere() {
        let css = ".btn { color: red }\n@layer base { .x {} }\n";
        assert_eq!(run(css, &["base"]), (css.to_string(), 0));
    }
}
