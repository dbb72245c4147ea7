use super::Codemod;
use crate::error::CodemodResult;
use mill_analysis_imports::Stylesheet;
use mill_css_ast::{NodeId, NodeKind, Tree, WalkControl};

const INDENT: &str = "  ";

/// Gives nodes created by earlier passes newline and indentation raws.
/// Parsed nodes keep their raws, except that subtrees moved under a new
/// container are re-indented to sit one level deeper than it.
pub struct FormatNodes;

impl Codemod for FormatNodes {
    fn id(&self) -> &'static str {
        "format-nodes"
    }

    fn apply(&self, sheet: &mut Stylesheet) -> CodemodResult<usize> {
        let tree = &mut sheet.tree;
        let mut fresh = Vec::new();
        tree.walk(tree.root(), |tree, id| {
            if tree.get(id).fresh {
                fresh.push(id);
            }
            WalkControl::Continue
        });

        for id in &fresh {
            format_node(tree, *id);
        }
        Ok(fresh.len())
    }
}

fn format_node(tree: &mut Tree, id: NodeId) {
    let depth = depth(tree, id);
    let root = tree.root();
    let leading = if tree.parent(id) == Some(root) && tree.index_of(id) == Some(0) {
        String::new()
    } else {
        line_break(&tree.get(id).raws.before, depth)
    };
    let has_children = !tree.children(id).is_empty();

    let data = tree.get_mut(id);
    data.raws.before = leading;
    match &data.kind {
        NodeKind::AtRule(at_rule) => {
            data.raws.after_name = if at_rule.params.is_empty() {
                String::new()
            } else {
                " ".to_string()
            };
            if at_rule.block {
                data.raws.between = " ".to_string();
                data.raws.after = closing(has_children, depth);
                data.raws.semicolon = false;
            } else {
                data.raws.between = String::new();
                data.raws.semicolon = true;
            }
        }
        NodeKind::Rule(_) => {
            data.raws.between = " ".to_string();
            data.raws.after = closing(has_children, depth);
        }
        NodeKind::Decl(_) => {
            data.raws.between = ": ".to_string();
            data.raws.after = String::new();
            data.raws.semicolon = true;
        }
        NodeKind::Root | NodeKind::Comment(_) | NodeKind::Marker(_) => {}
    }
    data.fresh = false;

    for (index, child) in tree.children(id).to_vec().into_iter().enumerate() {
        let data = tree.get(child);
        if !data.fresh && data.raws.before.trim().is_empty() {
            reindent(tree, child, depth + 1, index == 0);
        }
    }
}

/// Move a parsed subtree to `depth`, shifting the indentation of everything inside it by
/// the same amount
fn reindent(tree: &mut Tree, node: NodeId, depth: usize, first: bool) {
    let before = &tree.get(node).raws.before;
    let old = trailing_indent(before).unwrap_or(0);
    let new = INDENT.len() * depth;
    let newlines = if first {
        1
    } else {
        before.matches('\n').count().max(1)
    };
    tree.get_mut(node).raws.before = format!("{}{}", "\n".repeat(newlines), INDENT.repeat(depth));

    let shift = |raw: &mut String| {
        if let Some(current) = trailing_indent(raw) {
            let target = (current + new).saturating_sub(old);
            raw.truncate(raw.len() - current);
            raw.push_str(&" ".repeat(target));
        }
    };
    shift(&mut tree.get_mut(node).raws.after);
    for descendant in tree.descendants(node) {
        let raws = &mut tree.get_mut(descendant).raws;
        shift(&mut raws.before);
        shift(&mut raws.after);
    }
}

/// Width of the whitespace after the last newline of `raw`, when there is one
fn trailing_indent(raw: &str) -> Option<usize> {
    let tail = &raw[raw.rfind('\n')? + 1..];
    tail.chars()
        .all(|ch| ch == ' ' || ch == '\t')
        .then_some(tail.len())
}

/// Nesting depth below the root, `0` for top-level nodes
fn depth(tree: &Tree, id: NodeId) -> usize {
    let mut depth = 0;
    let mut current = tree.parent(id);
    while let Some(parent) = current {
        if parent == tree.root() {
            break;
        }
        depth += 1;
        current = tree.parent(parent);
    }
    depth
}

/// Newlines kept from `existing` (at least one) followed by indentation
fn line_break(existing: &str, depth: usize) -> String {
    let newlines = existing.matches('\n').count().max(1);
    format!("{}{}", "\n".repeat(newlines), INDENT.repeat(depth))
}

fn closing(has_children: bool, depth: usize) -> String {
    if has_children {
        format!("\n{}", INDENT.repeat(depth))
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mill_css_ast::{AtRule, Decl};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_formats_fresh_nodes_only() {
        let mut sheet = Stylesheet::parse(".keep {color:red}", None).unwrap();
        let tree = &mut sheet.tree;
        let root = tree.root();
        let utility = tree.create(NodeKind::AtRule(AtRule::block("utility", "tab-4")));
        let decl = tree.create(NodeKind::Decl(Decl {
            prop: "tab-size".to_string(),
            value: "4".to_string(),
        }));
        tree.append(utility, decl);
        tree.append(root, utility);

        let changed = FormatNodes.apply(&mut sheet).unwrap();
        assert_eq!(changed, 2);
        assert_eq!(
            sheet.content(),
            ".keep {color:red}\n@utility tab-4 {\n  tab-size: 4;\n}"
        );
        assert_eq!(FormatNodes.apply(&mut sheet).unwrap(), 0);
    }

    #[test]
    fn test_reindents_moved_children() {
        let mut sheet = Stylesheet::parse("\n\nh1 {}\n.a {}", None).unwrap();
        let tree = &mut sheet.tree;
        let root = tree.root();
        let layer = tree.create(NodeKind::AtRule(AtRule::block("layer", "base")));
        for child in tree.children(root).to_vec() {
            tree.append(layer, child);
        }
        tree.append(root, layer);

        FormatNodes.apply(&mut sheet).unwrap();
        assert_eq!(sheet.content(), "@layer base {\n  h1 {}\n  .a {}\n}");
    }

    #[test]
    fn test_keeps_blank_lines_before_fresh_nodes() {
        let mut sheet = Stylesheet::parse(".a {}", None).unwrap();
        let tree = &mut sheet.tree;
        let root = tree.root();
        let import = tree.create(NodeKind::AtRule(AtRule::statement("import", "\"x.css\"")));
        tree.get_mut(import).raws.before = "\n\n".to_string();
        tree.append(root, import);

        FormatNodes.apply(&mut sheet).unwrap();
        assert_eq!(sheet.content(), ".a {}\n\n@import \"x.css\";");
    }
}
