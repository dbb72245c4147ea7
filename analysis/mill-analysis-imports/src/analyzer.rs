//! Import-graph analysis
//!
//! Recovers, for every stylesheet of a graph, the import sites that pull it
//! in, the cascade layers and media it was imported under, and the sheets
//! that import it. Trees are flattened on disposable copies; the real trees
//! come out of [`analyze`] printing exactly as they went in.

use crate::error::AnalysisResult;
use crate::markers::MarkerSet;
use crate::params::parse_import_params;
use crate::resolver::{FlattenHooks, ImportResolver};
use crate::stylesheet::{ImportEdge, SheetId, StylesheetGraph};
use mill_css_ast::Tree;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// An import whose origin could not be attributed to a file of the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ProvenanceIssue {
    /// No import marker precedes the entered file in the flattened tree
    MissingImportMarker { file: PathBuf },
    /// The import site lives in a sheet that has no file
    AnonymousImporter { file: PathBuf },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Import edges recorded across the graph
    pub edges: usize,
    pub issues: Vec<ProvenanceIssue>,
}

struct GraphHooks<'a> {
    graph: &'a StylesheetGraph,
    markers: &'a mut MarkerSet,
}

impl FlattenHooks for GraphHooks<'_> {
    fn load(&mut self, file: &Path) -> Option<Tree> {
        let id = self.graph.find_by_file(file)?;
        self.graph.get(id).map(|sheet| sheet.tree.clone())
    }

    fn on_enter(&mut self, file: &Path, tree: &mut Tree, from_disk: bool) {
        self.markers.enter_file(tree, file, from_disk);
    }
}

struct FoundEdge {
    target: SheetId,
    edge: ImportEdge,
}

/// Populate `layers`, `media`, `import_edges` and `parents` of every sheet in `graph`.
///
/// A resolver failure aborts the analysis; the trees are restored first.
pub fn analyze(
    graph: &mut StylesheetGraph,
    resolver: &dyn ImportResolver,
) -> AnalysisResult<AnalysisReport> {
    let mut markers = MarkerSet::new();
    let seeded = markers.seed_graph(graph);
    tracing::debug!(sheets = graph.len(), seeded, "Seeded import markers");

    let collected = collect_edges(graph, resolver, &mut markers);
    markers.restore(graph);
    let (found, issues) = collected?;

    let mut report = AnalysisReport {
        edges: 0,
        issues,
    };
    for FoundEdge { target, edge } in found {
        let Some(sheet) = graph.get_mut(target) else {
            continue;
        };
        let params = edge.params.clone();
        if !sheet.add_edge(edge) {
            continue;
        }
        let parsed = parse_import_params(&params);
        sheet.layers.extend(parsed.layers);
        sheet.media.extend(parsed.media);
        report.edges += 1;
    }

    link_parents(graph);

    tracing::info!(
        sheets = graph.len(),
        edges = report.edges,
        issues = report.issues.len(),
        "Analyzed import graph"
    );
    Ok(report)
}

fn collect_edges(
    graph: &StylesheetGraph,
    resolver: &dyn ImportResolver,
    markers: &mut MarkerSet,
) -> AnalysisResult<(Vec<FoundEdge>, Vec<ProvenanceIssue>)> {
    let mut found = Vec::new();
    let mut issues = Vec::new();

    for (id, sheet) in graph.iter() {
        let mut hooks = GraphHooks {
            graph,
            markers: &mut *markers,
        };
        let flat = resolver.flatten(sheet.tree.clone(), sheet.file.as_deref(), &mut hooks)?;
        tracing::debug!(sheet = %id, file = %sheet.display_name(), "Flattened stylesheet");

        for (node, file_marker) in markers.file_markers(&flat) {
            let Some(target) = graph.find_by_file(&file_marker.file) else {
                continue;
            };
            let issue = match markers.find_import_marker(&flat, node) {
                Some(import) => match &import.source_file {
                    Some(source_file) => {
                        found.push(FoundEdge {
                            target,
                            edge: ImportEdge {
                                source_file: source_file.clone(),
                                rule: import.original,
                                params: import.params.clone(),
                            },
                        });
                        continue;
                    }
                    None => ProvenanceIssue::AnonymousImporter {
                        file: file_marker.file.clone(),
                    },
                },
                None => ProvenanceIssue::MissingImportMarker {
                    file: file_marker.file.clone(),
                },
            };
            if !issues.contains(&issue) {
                tracing::warn!(issue = ?issue, "Could not attribute import");
                issues.push(issue);
            }
        }
    }
    Ok((found, issues))
}

fn link_parents(graph: &mut StylesheetGraph) {
    let links: Vec<(SheetId, SheetId)> = graph
        .iter()
        .flat_map(|(child, sheet)| {
            sheet
                .import_edges
                .iter()
                .filter_map(|edge| graph.find_by_file(&edge.source_file))
                .map(move |parent| (child, parent))
                .collect::<Vec<_>>()
        })
        .collect();
    for (child, parent) in links {
        if let Some(sheet) = graph.get_mut(child) {
            sheet.parents.insert(parent);
        }
    }
}
