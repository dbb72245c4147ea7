//! Node payloads stored in a [`Tree`](crate::Tree)

use std::path::Path;
use std::sync::Arc;

/// Index of a node inside its owning tree's arena.
///
/// Ids stay valid for the lifetime of the tree, including while a node is
/// detached, and are preserved by `Tree::clone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Opaque identity of a transient marker node.
///
/// The tree never interprets markers; whoever inserts them keeps the
/// meaning in a side table keyed by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    AtRule(AtRule),
    Rule(Rule),
    Decl(Decl),
    Comment(Comment),
    /// Synthetic node that prints as nothing
    Marker(MarkerId),
}

/// `@name params;` or `@name params { ... }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    pub name: String,
    pub params: String,
    pub block: bool,
}

impl AtRule {
    pub fn statement(name: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: params.into(),
            block: false,
        }
    }

    pub fn block(name: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: params.into(),
            block: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    pub prop: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
}

/// Verbatim whitespace and punctuation around a node.
///
/// | field        | root       | at-rule             | rule          | decl                  | comment |
/// |--------------|------------|---------------------|---------------|-----------------------|---------|
/// | `before`     | -          | before `@`          | before sel.   | before prop           | before  |
/// | `after_name` | -          | after the name      | -             | -                     | -       |
/// | `between`    | -          | before `{`/`;`      | before `{`    | prop to value (`: `)  | -       |
/// | `after`      | trailing   | before `}`          | before `}`    | after value           | -       |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Raws {
    pub before: String,
    pub after_name: String,
    pub between: String,
    pub after: String,
    /// Statement terminated by `;`
    pub semicolon: bool,
}

/// Where a parsed node came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub file: Option<Arc<Path>>,
    /// Byte offset of the node's first significant character
    pub offset: usize,
    /// 1-based
    pub line: usize,
    /// 1-based, in characters
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub kind: NodeKind,
    pub raws: Raws,
    pub source: Option<Source>,
    /// Set on nodes built in code rather than parsed; cleared once formatted
    pub fresh: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            raws: Raws::default(),
            source: None,
            fresh: true,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn as_at_rule(&self) -> Option<&AtRule> {
        match &self.kind {
            NodeKind::AtRule(at_rule) => Some(at_rule),
            _ => None,
        }
    }

    pub fn as_rule(&self) -> Option<&Rule> {
        match &self.kind {
            NodeKind::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_marker(&self) -> Option<MarkerId> {
        match self.kind {
            NodeKind::Marker(id) => Some(id),
            _ => None,
        }
    }

    /// True for an at-rule with the given name, compared case-insensitively
    pub fn is_at_rule(&self, name: &str) -> bool {
        self.as_at_rule()
            .is_some_and(|at_rule| at_rule.name.eq_ignore_ascii_case(name))
    }

    /// Nodes that own a `{ ... }` body
    pub fn is_container(&self) -> bool {
        match &self.kind {
            NodeKind::Root | NodeKind::Rule(_) => true,
            NodeKind::AtRule(at_rule) => at_rule.block,
            _ => false,
        }
    }
}
