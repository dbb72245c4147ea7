use super::Codemod;
use crate::error::CodemodResult;
use mill_analysis_imports::{parse_import_params, Stylesheet};
use mill_css_ast::{AtRule, NodeId, NodeKind, Tree};

const TAILWIND_LAYERS: [&str; 3] = ["base", "components", "utilities"];

/// At-rules that stay at the top level regardless of the preceding directive
const STRUCTURAL_AT_RULES: [&str; 14] = [
    "charset",
    "config",
    "custom-variant",
    "import",
    "layer",
    "namespace",
    "plugin",
    "property",
    "reference",
    "source",
    "tailwind",
    "theme",
    "utility",
    "variant",
];

/// Wraps plain top-level nodes following `@tailwind <x>` (or
/// `@import "tailwindcss/<x>"`) into `@layer <x> { ... }`
pub struct MigrateMissingLayers;

impl Codemod for MigrateMissingLayers {
    fn id(&self) -> &'static str {
        "migrate-missing-layers"
    }

    fn apply(&self, sheet: &mut Stylesheet) -> CodemodResult<usize> {
        let tree = &mut sheet.tree;
        let root = tree.root();
        let mut current: Option<String> = None;
        let mut group: Vec<NodeId> = Vec::new();
        let mut wrapped = 0;

        for node in tree.children(root).to_vec() {
            if let Some(layer) = directive_layer(tree, node) {
                wrapped += flush(tree, current.as_deref(), &mut group);
                current = Some(layer);
            } else if is_plain(tree, node) || is_comment(tree, node) {
                group.push(node);
            } else {
                wrapped += flush(tree, current.as_deref(), &mut group);
            }
        }
        wrapped += flush(tree, current.as_deref(), &mut group);
        Ok(wrapped)
    }
}

/// Layer named by a legacy directive, if `node` is one
fn directive_layer(tree: &Tree, node: NodeId) -> Option<String> {
    let at_rule = tree.at_rule(node)?;
    let name = if at_rule.name.eq_ignore_ascii_case("tailwind") {
        at_rule.params.trim().to_string()
    } else if at_rule.name.eq_ignore_ascii_case("import") {
        let url = parse_import_params(&at_rule.params).url;
        url.strip_prefix("tailwindcss/")?.to_string()
    } else {
        return None;
    };
    TAILWIND_LAYERS.contains(&name.as_str()).then_some(name)
}

fn is_plain(tree: &Tree, node: NodeId) -> bool {
    match tree.kind(node) {
        NodeKind::Rule(_) => true,
        NodeKind::AtRule(at_rule) => !STRUCTURAL_AT_RULES
            .iter()
            .any(|name| at_rule.name.eq_ignore_ascii_case(name)),
        _ => false,
    }
}

fn is_comment(tree: &Tree, node: NodeId) -> bool {
    matches!(tree.kind(node), NodeKind::Comment(_))
}

/// Wrap the pending group, minus trailing comments, into `@layer <layer>`
fn flush(tree: &mut Tree, layer: Option<&str>, group: &mut Vec<NodeId>) -> usize {
    let mut nodes = std::mem::take(group);
    while nodes.last().is_some_and(|node| is_comment(tree, *node)) {
        nodes.pop();
    }
    let (Some(layer), Some(first)) = (layer, nodes.first().copied()) else {
        return 0;
    };

    let wrapper = tree.create(NodeKind::AtRule(AtRule::block("layer", layer)));
    tree.insert_before(first, wrapper);
    for node in &nodes {
        tree.append(wrapper, *node);
    }
    tracing::debug!(layer, nodes = nodes.len(), "Wrapped nodes into missing layer");
    nodes.len()
}
