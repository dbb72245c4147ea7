//! Serialize a [`Tree`] back to CSS text

use crate::node::{NodeId, NodeKind};
use crate::tree::Tree;
use std::fmt;

impl Tree {
    /// Render the attached part of the tree
    pub fn to_css(&self) -> String {
        let mut out = String::new();
        write_node(self, self.root(), &mut out);
        out
    }

    /// Render a single node and its subtree, raws included
    pub fn node_to_css(&self, id: NodeId) -> String {
        let mut out = String::new();
        write_node(self, id, &mut out);
        out
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

fn write_children(tree: &Tree, id: NodeId, out: &mut String) {
    for child in tree.children(id) {
        write_node(tree, *child, out);
    }
}

fn write_node(tree: &Tree, id: NodeId, out: &mut String) {
    let node = tree.get(id);
    let raws = &node.raws;
    match &node.kind {
        NodeKind::Root => {
            write_children(tree, id, out);
            out.push_str(&raws.after);
        }
        NodeKind::AtRule(at_rule) => {
            out.push_str(&raws.before);
            out.push('@');
            out.push_str(&at_rule.name);
            if node.fresh && raws.after_name.is_empty() && !at_rule.params.is_empty() {
                out.push(' ');
            } else {
                out.push_str(&raws.after_name);
            }
            out.push_str(&at_rule.params);
            out.push_str(&raws.between);
            if at_rule.block {
                out.push('{');
                write_children(tree, id, out);
                out.push_str(&raws.after);
                out.push('}');
            } else if raws.semicolon {
                out.push(';');
            }
        }
        NodeKind::Rule(rule) => {
            out.push_str(&raws.before);
            out.push_str(&rule.selector);
            out.push_str(&raws.between);
            out.push('{');
            write_children(tree, id, out);
            out.push_str(&raws.after);
            out.push('}');
        }
        NodeKind::Decl(decl) => {
            out.push_str(&raws.before);
            out.push_str(&decl.prop);
            if node.fresh && raws.between.is_empty() && !decl.value.is_empty() {
                out.push(':');
            } else {
                out.push_str(&raws.between);
            }
            out.push_str(&decl.value);
            out.push_str(&raws.after);
            if raws.semicolon {
                out.push(';');
            }
        }
        NodeKind::Comment(comment) => {
            out.push_str(&raws.before);
            out.push_str("/*");
            out.push_str(&comment.text);
            out.push_str("*/");
        }
        NodeKind::Marker(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use crate::node::{AtRule, MarkerId, NodeKind};
    use crate::parser::parse;
    use crate::tree::Tree;
    use pretty_assertions::assert_eq;

    fn round_trip(css: &str) {
        let tree = parse(css, None).unwrap();
        assert_eq!(tree.to_css(), css);
    }

    #[test]
    fn test_round_trip_is_exact() {
        round_trip("");
        round_trip("\n\n");
        round_trip("@import 'a.css';\n@import url(b.css) layer(x) screen ;\n");
        round_trip("/* header */\n.a{color:red}\n.b {\n  color : blue ;\n  margin: 0\n}\n");
        round_trip("@media (min-width: 640px) {\n  .a { padding: 1rem; }\n}\n");
        round_trip("@layer theme, base, components, utilities;\n@tailwind base;;\n");
        round_trip(".a { background: url(data:image/png;base64,AAAA) }");
        round_trip("@font-face{font-family:\"X\";src:url('x.woff2')}");
        round_trip("@import\"tight.css\";");
        round_trip(".a {\n  &:hover { color: red; }\n  @apply flex !important;\n}\n");
        round_trip("a::after { content: '}' } /* trailing */");
        round_trip(".sm\\:flex { content: \"a\\\"b\" }\n[data-x=\"{\"] { grid-area: 1 / 2 }\n");
    }

    #[test]
    fn test_markers_print_as_nothing() {
        let mut tree = parse(".a {}\n", None).unwrap();
        let root = tree.root();
        let marker = tree.create(NodeKind::Marker(MarkerId(7)));
        tree.prepend(root, marker);
        assert_eq!(tree.to_css(), ".a {}\n");
    }

    #[test]
    fn test_fresh_nodes_print_compact() {
        let mut tree = Tree::new();
        let root = tree.root();
        let import = tree.create(NodeKind::AtRule(AtRule::statement("import", "\"x.css\"")));
        tree.get_mut(import).raws.semicolon = true;
        tree.append(root, import);
        assert_eq!(tree.to_css(), "@import \"x.css\";");
    }

    #[test]
    fn test_detached_nodes_are_not_printed() {
        let mut tree = parse(".a {}\n.b {}\n", None).unwrap();
        let b = tree.children(tree.root())[1];
        tree.remove(b);
        assert_eq!(tree.to_css(), ".a {}\n");
        assert_eq!(tree.node_to_css(b), "\n.b {}");
    }
}
