//! Transient marker nodes used to recover file boundaries after flattening
//!
//! Before the resolver runs, every `@import` rule is swapped for an
//! [`ImportMarker`] and a tagged clone of the rule is left right after it for
//! the resolver to consume. Every file the resolver enters gets a
//! [`FileMarker`] as its first node. After flattening, walking backwards from
//! a file marker reaches the import marker of the site that pulled it in.
//!
//! All marker state lives in a [`MarkerSet`] owned by one analysis run.

use crate::stylesheet::{SheetId, StylesheetGraph};
use mill_css_ast::{MarkerId, NodeId, NodeKind, Overrides, Tree, WalkControl};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Token appended to the params of tagged `@import` clones
pub const SENTINEL: &str = "__mill_import__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    Import(ImportMarker),
    File(FileMarker),
}

/// Stands in for an original `@import` rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMarker {
    /// File that contains the rule; `None` for in-memory sheets
    pub source_file: Option<PathBuf>,
    /// The original rule, detached while the marker is in place
    pub original: NodeId,
    pub params: String,
}

/// First node of every file the resolver entered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMarker {
    pub file: PathBuf,
}

#[derive(Debug, Clone, Copy)]
struct SeededImport {
    sheet: SheetId,
    marker: NodeId,
    original: NodeId,
    clone: NodeId,
}

#[derive(Debug, Default)]
pub struct MarkerSet {
    next: u64,
    markers: HashMap<MarkerId, Marker>,
    seeded: Vec<SeededImport>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    fn allocate(&mut self, marker: Marker) -> MarkerId {
        let id = MarkerId(self.next);
        self.next += 1;
        self.markers.insert(id, marker);
        id
    }

    /// Seed every `@import` of every sheet in `graph`. Returns the number of rules seeded.
    pub fn seed_graph(&mut self, graph: &mut StylesheetGraph) -> usize {
        let mut count = 0;
        for id in graph.ids().collect::<Vec<_>>() {
            let Some(sheet) = graph.get_mut(id) else {
                continue;
            };
            let file = sheet.file.clone();
            for (marker, original, clone) in self.seed_tree(&mut sheet.tree, file.as_deref()) {
                self.seeded.push(SeededImport {
                    sheet: id,
                    marker,
                    original,
                    clone,
                });
                count += 1;
            }
        }
        count
    }

    /// Swap each `@import` in `tree` for an import marker followed by a tagged clone.
    ///
    /// Returns `(marker node, original rule, clone)` triples.
    pub fn seed_tree(
        &mut self,
        tree: &mut Tree,
        file: Option<&Path>,
    ) -> Vec<(NodeId, NodeId, NodeId)> {
        let mut seeded = Vec::new();
        for rule in tree.at_rules("import") {
            let Some(params) = tree.at_rule(rule).map(|at_rule| at_rule.params.clone()) else {
                continue;
            };
            if params.contains(SENTINEL) {
                continue;
            }

            let marker_id = self.allocate(Marker::Import(ImportMarker {
                source_file: file.map(Path::to_path_buf),
                original: rule,
                params: params.clone(),
            }));
            let tagged = format!("{} {}{}", params, SENTINEL, marker_id.0);
            let clone = tree.clone_node(rule, &Overrides::default().params(tagged));
            tree.insert_after(rule, clone);

            let marker = tree.create(NodeKind::Marker(marker_id));
            tree.replace(rule, marker);

            tracing::trace!(
                marker = marker_id.0,
                file = ?file,
                params = %params,
                "Seeded import marker"
            );
            seeded.push((marker, rule, clone));
        }
        seeded
    }

    /// Mark `tree` as the content of `file`. Trees read from disk are seeded first
    /// so their own imports can be attributed.
    pub fn enter_file(&mut self, tree: &mut Tree, file: &Path, from_disk: bool) {
        if from_disk {
            self.seed_tree(tree, Some(file));
        }
        let marker_id = self.allocate(Marker::File(FileMarker {
            file: file.to_path_buf(),
        }));
        let node = tree.create(NodeKind::Marker(marker_id));
        let root = tree.root();
        tree.prepend(root, node);
    }

    /// Attached file markers of `tree` in document order
    pub fn file_markers<'a>(&'a self, tree: &Tree) -> Vec<(NodeId, &'a FileMarker)> {
        let mut found = Vec::new();
        tree.walk(tree.root(), |tree, id| {
            if let Some(Marker::File(file)) = tree.get(id).as_marker().and_then(|m| self.get(m)) {
                found.push((id, file));
            }
            WalkControl::Continue
        });
        found
    }

    /// Walk backwards from `from` (previous sibling, else parent) to the nearest import marker
    pub fn find_import_marker(&self, tree: &Tree, from: NodeId) -> Option<&ImportMarker> {
        let mut current = from;
        loop {
            current = match tree.prev_sibling(current) {
                Some(prev) => prev,
                None => tree.parent(current)?,
            };
            if let Some(Marker::Import(import)) =
                tree.get(current).as_marker().and_then(|m| self.get(m))
            {
                return Some(import);
            }
        }
    }

    /// Put every original `@import` back and drop the tagged clones and any stray markers
    pub fn restore(&mut self, graph: &mut StylesheetGraph) {
        for seeded in self.seeded.drain(..) {
            let Some(sheet) = graph.get_mut(seeded.sheet) else {
                continue;
            };
            if sheet.tree.is_attached(seeded.marker) {
                sheet.tree.replace(seeded.marker, seeded.original);
            } else {
                tracing::warn!(
                    sheet = %sheet.display_name(),
                    "Import marker was detached before restore"
                );
            }
            sheet.tree.remove(seeded.clone);
        }
        for (_, sheet) in graph.iter_mut() {
            let swept = sweep(&mut sheet.tree);
            if swept > 0 {
                tracing::warn!(
                    sheet = %sheet.display_name(),
                    swept,
                    "Removed leftover marker nodes"
                );
            }
        }
    }
}

/// Remove marker nodes and tagged `@import` clones still attached to `tree`
pub fn sweep(tree: &mut Tree) -> usize {
    let mut leftovers = Vec::new();
    tree.walk(tree.root(), |tree, id| {
        let node = tree.get(id);
        let tagged = node
            .as_at_rule()
            .is_some_and(|at_rule| at_rule.params.contains(SENTINEL));
        if node.as_marker().is_some() || tagged {
            leftovers.push(id);
            return WalkControl::SkipChildren;
        }
        WalkControl::Continue
    });
    for id in &leftovers {
        tree.remove(*id);
    }
    leftovers.len()
}
