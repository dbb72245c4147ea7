//! Arena-backed mutable CSS tree

use crate::node::{AtRule, NodeData, NodeId, NodeKind, Raws};

/// Decision returned by a [`Tree::walk`] visitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    Continue,
    /// Do not descend into the current node's children
    SkipChildren,
    /// Abort the whole traversal
    Stop,
}

/// Payload replacements applied by [`Tree::clone_node`]
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub params: Option<String>,
    pub selector: Option<String>,
    pub raws: Option<Raws>,
}

impl Overrides {
    pub fn params(mut self, params: impl Into<String>) -> Self {
        self.params = Some(params.into());
        self
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn raws(mut self, raws: Raws) -> Self {
        self.raws = Some(raws);
        self
    }
}

/// A stylesheet tree.
///
/// Nodes live in an arena and refer to each other by [`NodeId`]. Removing a
/// node only detaches it, so ids held elsewhere (for example by an import
/// edge) keep pointing at the same payload and can be re-attached later.
/// `Clone` produces an independent copy in which every id means the same node.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        let mut root = NodeData::new(NodeKind::Root);
        root.fresh = false;
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Ids are only minted by this tree, so lookups index the arena directly.
    pub fn get(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Number of nodes ever allocated, attached or not
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Allocate a detached node built in code
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        self.push(NodeData::new(kind))
    }

    pub(crate) fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(data);
        id
    }

    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        index
            .checked_sub(1)
            .map(|prev| self.children(parent)[prev])
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Whether `id` is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.parent(node) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// Detach `id` from its parent. The node and its subtree stay in the arena.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }
    }

    /// Insert `child` at `index` among `parent`'s children, moving it if attached elsewhere.
    pub fn insert_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if self.is_ancestor_or_self(child, parent) {
            tracing::warn!(
                parent = parent.index(),
                child = child.index(),
                "Refusing to insert a node into its own subtree"
            );
            return;
        }
        self.remove(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let len = self.children(parent).len();
        self.insert_at(parent, len, child);
    }

    pub fn prepend(&mut self, parent: NodeId, child: NodeId) {
        self.insert_at(parent, 0, child);
    }

    /// Insert `node` right before `anchor`. A detached anchor leaves `node` untouched.
    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) {
        if anchor == node {
            return;
        }
        self.remove(node);
        if let (Some(parent), Some(index)) = (self.parent(anchor), self.index_of(anchor)) {
            self.insert_at(parent, index, node);
        }
    }

    /// Insert `node` right after `anchor`. A detached anchor leaves `node` untouched.
    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) {
        if anchor == node {
            return;
        }
        self.remove(node);
        if let (Some(parent), Some(index)) = (self.parent(anchor), self.index_of(anchor)) {
            self.insert_at(parent, index + 1, node);
        }
    }

    /// Put `replacement` where `old` is and detach `old`
    pub fn replace(&mut self, old: NodeId, replacement: NodeId) {
        if old == replacement {
            return;
        }
        self.remove(replacement);
        if let (Some(parent), Some(index)) = (self.parent(old), self.index_of(old)) {
            self.nodes[parent.0].children[index] = replacement;
            self.nodes[replacement.0].parent = Some(parent);
            self.nodes[old.0].parent = None;
        }
    }

    /// Deep-copy `id` within this tree, applying `overrides` to the copied node only.
    /// The copy is returned detached.
    pub fn clone_node(&mut self, id: NodeId, overrides: &Overrides) -> NodeId {
        let copy = self.deep_copy(id);
        let data = &mut self.nodes[copy.0];
        match &mut data.kind {
            NodeKind::AtRule(at_rule) => {
                if let Some(params) = &overrides.params {
                    at_rule.params = params.clone();
                }
            }
            NodeKind::Rule(rule) => {
                if let Some(selector) = &overrides.selector {
                    rule.selector = selector.clone();
                }
            }
            _ => {}
        }
        if let Some(raws) = &overrides.raws {
            data.raws = raws.clone();
        }
        copy
    }

    fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let mut data = self.nodes[id.0].clone();
        let children = std::mem::take(&mut data.children);
        data.parent = None;
        let copy = self.push(data);
        for child in children {
            let child_copy = self.deep_copy(child);
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    /// Deep-copy node `id` of `other` into this tree, returned detached.
    /// To splice a whole file's content use [`Tree::import_children`].
    pub fn import_node(&mut self, other: &Tree, id: NodeId) -> NodeId {
        let mut data = other.get(id).clone();
        data.parent = None;
        data.children = Vec::new();
        let copy = self.push(data);
        for child in other.children(id) {
            let child_copy = self.import_node(other, *child);
            self.nodes[child_copy.0].parent = Some(copy);
            self.nodes[copy.0].children.push(child_copy);
        }
        copy
    }

    /// Copy every child of `other`'s root into this tree, detached and in order
    pub fn import_children(&mut self, other: &Tree) -> Vec<NodeId> {
        other
            .children(other.root())
            .iter()
            .map(|child| self.import_node(other, *child))
            .collect()
    }

    /// Depth-first, pre-order traversal of the descendants of `start`.
    pub fn walk<F>(&self, start: NodeId, mut visit: F)
    where
        F: FnMut(&Tree, NodeId) -> WalkControl,
    {
        let mut stack: Vec<NodeId> = self.children(start).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            match visit(self, id) {
                WalkControl::Stop => return,
                WalkControl::SkipChildren => {}
                WalkControl::Continue => {
                    stack.extend(self.children(id).iter().rev().copied());
                }
            }
        }
    }

    /// All descendants of `start` in pre-order
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(start, |_, id| {
            out.push(id);
            WalkControl::Continue
        });
        out
    }

    /// Attached at-rules named `name`, in document order
    pub fn at_rules(&self, name: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(self.root, |tree, id| {
            if tree.get(id).is_at_rule(name) {
                out.push(id);
            }
            WalkControl::Continue
        });
        out
    }

    pub fn at_rule(&self, id: NodeId) -> Option<&AtRule> {
        self.get(id).as_at_rule()
    }

    pub fn set_params(&mut self, id: NodeId, params: impl Into<String>) {
        if let NodeKind::AtRule(at_rule) = &mut self.nodes[id.0].kind {
            at_rule.params = params.into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Comment, Decl, Rule};
    use pretty_assertions::assert_eq;

    fn rule(tree: &mut Tree, selector: &str) -> NodeId {
        tree.create(NodeKind::Rule(Rule {
            selector: selector.to_string(),
        }))
    }

    #[test]
    fn test_insert_and_sibling_navigation() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = rule(&mut tree, ".a");
        let b = rule(&mut tree, ".b");
        let c = rule(&mut tree, ".c");
        tree.append(root, a);
        tree.append(root, c);
        tree.insert_after(a, b);

        assert_eq!(tree.children(root), &[a, b, c]);
        assert_eq!(tree.prev_sibling(b), Some(a));
        assert_eq!(tree.next_sibling(b), Some(c));
        assert_eq!(tree.prev_sibling(a), None);
        assert_eq!(tree.parent(b), Some(root));
    }

    #[test]
    fn test_replace_detaches_old_node() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = rule(&mut tree, ".a");
        let b = rule(&mut tree, ".b");
        tree.append(root, a);
        tree.replace(a, b);

        assert_eq!(tree.children(root), &[b]);
        assert!(!tree.is_attached(a));
        assert!(tree.is_attached(b));

        // The detached node keeps its payload and can come back
        tree.replace(b, a);
        assert_eq!(tree.children(root), &[a]);
    }

    #[test]
    fn test_clone_node_applies_overrides_to_copy_only() {
        let mut tree = Tree::new();
        let root = tree.root();
        let import = tree.create(NodeKind::AtRule(AtRule::statement("import", "\"a.css\"")));
        tree.append(root, import);

        let copy = tree.clone_node(import, &Overrides::default().params("\"a.css\" tagged"));
        tree.insert_after(import, copy);

        assert_eq!(tree.at_rule(import).unwrap().params, "\"a.css\"");
        assert_eq!(tree.at_rule(copy).unwrap().params, "\"a.css\" tagged");
        assert_eq!(tree.children(root), &[import, copy]);
    }

    #[test]
    fn test_clone_node_copies_children() {
        let mut tree = Tree::new();
        let root = tree.root();
        let parent = rule(&mut tree, ".a");
        let decl = tree.create(NodeKind::Decl(Decl {
            prop: "color".to_string(),
            value: "red".to_string(),
        }));
        tree.append(root, parent);
        tree.append(parent, decl);

        let copy = tree.clone_node(parent, &Overrides::default().selector(".b"));
        assert_eq!(tree.children(copy).len(), 1);
        assert_ne!(tree.children(copy)[0], decl);
        assert_eq!(tree.get(copy).as_rule().unwrap().selector, ".b");
    }

    #[test]
    fn test_walk_skip_and_stop() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = rule(&mut tree, ".a");
        let inner = tree.create(NodeKind::Comment(Comment {
            text: "inner".to_string(),
        }));
        let b = rule(&mut tree, ".b");
        let c = rule(&mut tree, ".c");
        tree.append(root, a);
        tree.append(a, inner);
        tree.append(root, b);
        tree.append(root, c);

        let mut seen = Vec::new();
        tree.walk(root, |_, id| {
            seen.push(id);
            if id == a {
                WalkControl::SkipChildren
            } else if id == b {
                WalkControl::Stop
            } else {
                WalkControl::Continue
            }
        });
        assert_eq!(seen, vec![a, b]);
        assert_eq!(tree.descendants(root), vec![a, inner, b, c]);
    }

    #[test]
    fn test_import_node_from_other_tree() {
        let mut other = Tree::new();
        let other_root = other.root();
        let a = rule(&mut other, ".a");
        other.append(other_root, a);

        let mut tree = Tree::new();
        let copies = tree.import_children(&other);
        assert_eq!(copies.len(), 1);
        assert_eq!(tree.get(copies[0]).as_rule().unwrap().selector, ".a");
        assert!(!tree.is_attached(copies[0]));
    }

    #[test]
    fn test_refuses_to_insert_into_own_subtree() {
        let mut tree = Tree::new();
        let root = tree.root();
        let a = rule(&mut tree, ".a");
        let b = rule(&mut tree, ".b");
        tree.append(root, a);
        tree.append(a, b);
        tree.append(b, a);
        assert_eq!(tree.parent(a), Some(root));
        assert_eq!(tree.parent(b), Some(a));
    }
}
