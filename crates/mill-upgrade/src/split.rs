//! Moving `@utility` rules into derived sibling stylesheets
//!
//! A sheet imported into one of the configured layers loses its top-level
//! `@utility` rules to `<name>.<suffix>.css`. Every import site of the
//! original gains an `@import` of the derived sheet right after it, and the
//! derived sheet's parents follow the original's, substituting split parents
//! with their own derived sheets.

use mill_analysis_imports::{
    parse_import_params, url_path, ImportEdge, SheetId, Stylesheet, StylesheetGraph,
};
use mill_config::SplitConfig;
use mill_css_ast::{AtRule, NodeId, NodeKind, Tree};
use mill_foundation::UpgradeError;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SplitError {
    #[error("Derived stylesheet {} would overwrite an existing sheet", path.display())]
    PathCollision { path: PathBuf },
}

impl From<SplitError> for UpgradeError {
    fn from(err: SplitError) -> Self {
        match err {
            SplitError::PathCollision { path } => UpgradeError::SplitCollision { path },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitReport {
    pub derived: Vec<DerivedSheet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedSheet {
    pub source: PathBuf,
    pub file: PathBuf,
    /// `@utility` rules moved over
    pub utilities: usize,
    /// `@import` rules added for it
    pub imports: usize,
}

struct Planned {
    source: SheetId,
    path: PathBuf,
    utilities: Vec<NodeId>,
}

/// Split every eligible sheet of `graph` once. Derived sheets are appended to
/// the graph and are not themselves considered.
pub fn split(graph: &mut StylesheetGraph, config: &SplitConfig) -> Result<SplitReport, SplitError> {
    let plan = plan(graph, config)?;
    if plan.is_empty() {
        return Ok(SplitReport::default());
    }

    let mut derived_of: HashMap<SheetId, SheetId> = HashMap::new();
    for planned in &plan {
        let Some(source) = graph.get_mut(planned.source) else {
            continue;
        };
        let tree = extract_utilities(&mut source.tree, &planned.utilities);
        let derived = graph.push(Stylesheet::from_tree(tree, Some(planned.path.clone())));
        derived_of.insert(planned.source, derived);
    }

    let mut report = SplitReport::default();
    for planned in &plan {
        let Some(&derived) = derived_of.get(&planned.source) else {
            continue;
        };
        let Some(source) = graph.get(planned.source) else {
            continue;
        };
        let edges = source.import_edges.clone();
        let parents: BTreeSet<SheetId> = source
            .parents
            .iter()
            .map(|parent| derived_of.get(parent).copied().unwrap_or(*parent))
            .collect();

        let new_edges: Vec<ImportEdge> = edges
            .iter()
            .filter_map(|edge| link_import(graph, edge, &planned.path))
            .collect();

        tracing::info!(
            source = %planned.path.display(),
            utilities = planned.utilities.len(),
            imports = new_edges.len(),
            "Split utilities into derived stylesheet"
        );
        report.derived.push(DerivedSheet {
            source: graph
                .get(planned.source)
                .and_then(|sheet| sheet.file.clone())
                .unwrap_or_default(),
            file: planned.path.clone(),
            utilities: planned.utilities.len(),
            imports: new_edges.len(),
        });
        if let Some(sheet) = graph.get_mut(derived) {
            sheet.parents = parents;
            sheet.import_edges = new_edges;
        }
    }
    Ok(report)
}

/// Decide which sheets split, checking every target path before anything changes
fn plan(graph: &StylesheetGraph, config: &SplitConfig) -> Result<Vec<Planned>, SplitError> {
    let mut plan: Vec<Planned> = Vec::new();
    for (id, sheet) in graph.iter() {
        let Some(file) = &sheet.file else {
            continue;
        };
        if !config.layers.iter().any(|layer| sheet.has_layer(layer)) {
            continue;
        }
        let utilities = top_level_utilities(&sheet.tree);
        if utilities.is_empty() {
            continue;
        }

        let path = derived_path(file, &config.suffix);
        let taken = graph.find_by_file(&path).is_some()
            || plan.iter().any(|planned| planned.path == path);
        if taken {
            return Err(SplitError::PathCollision { path });
        }
        plan.push(Planned {
            source: id,
            path,
            utilities,
        });
    }
    Ok(plan)
}

fn top_level_utilities(tree: &Tree) -> Vec<NodeId> {
    tree.children(tree.root())
        .iter()
        .copied()
        .filter(|node| tree.get(*node).is_at_rule("utility"))
        .collect()
}

/// Move `utilities` out of `tree` into a fresh tree, in order
fn extract_utilities(tree: &mut Tree, utilities: &[NodeId]) -> Tree {
    let source_root = tree.root();
    let led = tree
        .children(source_root)
        .first()
        .is_some_and(|first| utilities.contains(first));

    let mut derived = Tree::new();
    let root = derived.root();
    for (index, node) in utilities.iter().enumerate() {
        let copy = derived.import_node(tree, *node);
        if index == 0 {
            derived.get_mut(copy).raws.before = String::new();
        }
        derived.append(root, copy);
        tree.remove(*node);
    }
    derived.get_mut(root).raws.after = "\n".to_string();

    // The remaining sheet should not start with the gap the moved rules left
    if let Some(&first) = tree.children(source_root).first() {
        let before = &mut tree.get_mut(first).raws.before;
        if led && before.trim().is_empty() {
            before.clear();
        }
    }
    derived
}

/// Add `@import "<derived>";` right after the rule of `edge` and return the new edge
fn link_import(graph: &mut StylesheetGraph, edge: &ImportEdge, derived: &Path) -> Option<ImportEdge> {
    let Some(importer) = graph.find_by_file(&edge.source_file) else {
        tracing::warn!(
            importer = %edge.source_file.display(),
            "Importer is not part of the graph, derived import not added"
        );
        return None;
    };
    let sheet = graph.get_mut(importer)?;
    let tree = &mut sheet.tree;
    if !tree.is_attached(edge.rule) {
        tracing::warn!(
            importer = %edge.source_file.display(),
            params = %edge.params,
            "Import rule is no longer attached, derived import not added"
        );
        return None;
    }

    let specifier = derived_specifier(&parse_import_params(&edge.params).url, derived);
    let params = format!("\"{}\"", specifier);
    let before = &tree.get(edge.rule).raws.before;
    let before = if before.contains('\n') {
        before.clone()
    } else {
        "\n".to_string()
    };

    let import = tree.create(NodeKind::AtRule(AtRule::statement("import", params.as_str())));
    let data = tree.get_mut(import);
    data.raws.before = before;
    data.raws.after_name = " ".to_string();
    data.raws.semicolon = true;
    data.fresh = false;
    tree.insert_after(edge.rule, import);

    Some(ImportEdge {
        source_file: edge.source_file.clone(),
        rule: import,
        params,
    })
}

/// `dir/b.css` → `dir/b.<suffix>.css`. Any other final extension is replaced too.
pub fn derived_path(file: &Path, suffix: &str) -> PathBuf {
    file.with_extension(format!("{}.css", suffix))
}

/// Rewrite `url`, which imports the source sheet, to import `derived` instead:
/// the last segment becomes the derived file name, query and fragment are dropped
pub fn derived_specifier(url: &str, derived: &Path) -> String {
    let path = url_path(url);
    let name = derived
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    match path.rfind('/') {
        Some(slash) => format!("{}{}", &path[..=slash], name),
        None => name.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> SplitConfig {
        SplitConfig::default()
    }

    #[test]
    fn test_derived_names() {
        assert_eq!(
            derived_path(Path::new("/p/b.css"), "utilities"),
            PathBuf::from("/p/b.utilities.css")
        );
        assert_eq!(
            derived_path(Path::new("/p/theme.min.css"), "utils"),
            PathBuf::from("/p/theme.min.utils.css")
        );
        assert_eq!(
            derived_path(Path::new("/p/b.pcss"), "utilities"),
            PathBuf::from("/p/b.utilities.css")
        );

        let derived = Path::new("/p/b.utilities.css");
        assert_eq!(derived_specifier("./b.css", derived), "./b.utilities.css");
        assert_eq!(derived_specifier("./b.pcss", derived), "./b.utilities.css");
        assert_eq!(derived_specifier("b.css?v=2", derived), "b.utilities.css");
        assert_eq!(
            derived_specifier("../x/b", Path::new("/x/b.utilities.css")),
            "../x/b.utilities.css"
        );
    }

    fn sheet(file: &str, css: &str, layers: &[&str]) -> Stylesheet {
        let mut sheet = Stylesheet::parse(css, Some(PathBuf::from(file))).unwrap();
        sheet.layers = layers.iter().map(|layer| layer.to_string()).collect();
        sheet
    }

    #[test]
    fn test_skips_sheets_outside_split_layers() {
        let mut graph: StylesheetGraph = [
            sheet("/p/a.css", "@utility a {}", &[]),
            sheet("/p/b.css", "@utility b {}", &["base"]),
        ]
        .into_iter()
        .collect();

        let report = split(&mut graph, &config()).unwrap();
        assert!(report.derived.is_empty());
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_collision_changes_nothing() {
        let b = "@utility b {}\n.plain {}\n";
        let mut graph: StylesheetGraph = [
            sheet("/p/b.css", b, &["utilities"]),
            sheet("/p/b.utilities.css", "", &[]),
        ]
        .into_iter()
        .collect();

        let err = split(&mut graph, &config()).unwrap_err();
        assert!(matches!(
            err,
            SplitError::PathCollision { ref path } if path == Path::new("/p/b.utilities.css")
        ));
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.get(SheetId(0)).unwrap().content(), b);
    }

    #[test]
    fn test_moves_utilities_in_order() {
        let mut graph: StylesheetGraph = [sheet(
            "/p/b.css",
            "\n@utility one {\n  a: b;\n}\n.keep {}\n@utility two {}\n",
            &["components"],
        )]
        .into_iter()
        .collect();

        let report = split(&mut graph, &config()).unwrap();
        assert_eq!(report.derived.len(), 1);
        assert_eq!(report.derived[0].utilities, 2);
        assert_eq!(report.derived[0].imports, 0);

        assert_eq!(graph.get(SheetId(0)).unwrap().content(), ".keep {}\n");
        let derived = graph.get(SheetId(1)).unwrap();
        assert_eq!(derived.file.as_deref(), Some(Path::new("/p/b.utilities.css")));
        assert_eq!(
            derived.content(),
            "@utility one {\n  a: b;\n}\n@utility two {}\n"
        );
        assert!(derived.layers.is_empty());
    }

    /// Record every `@import` of `importer` as an edge of `target`
    fn link(graph: &mut StylesheetGraph, importer: SheetId, target: SheetId) {
        let sheet = graph.get(importer).unwrap();
        let file = sheet.file.clone().unwrap();
        let edges: Vec<ImportEdge> = sheet
            .tree
            .at_rules("import")
            .into_iter()
            .map(|rule| ImportEdge {
                source_file: file.clone(),
                rule,
                params: sheet.tree.at_rule(rule).unwrap().params.clone(),
            })
            .collect();
        let target_sheet = graph.get_mut(target).unwrap();
        for edge in edges {
            target_sheet.add_edge(edge);
        }
        target_sheet.parents.insert(importer);
    }

    #[test]
    fn test_every_import_site_gets_its_own_import() {
        let mut graph: StylesheetGraph = [
            sheet("/p/a.css", "@import \"b.css\" layer(utilities);\n.a {}\n", &[]),
            sheet("/p/nested/c.css", "@import \"../b.css\" layer(utilities);\n", &[]),
            sheet("/p/b.css", "@utility btn {}\n", &["utilities"]),
        ]
        .into_iter()
        .collect();
        link(&mut graph, SheetId(0), SheetId(2));
        link(&mut graph, SheetId(1), SheetId(2));

        let report = split(&mut graph, &config()).unwrap();
        assert_eq!(report.derived[0].imports, 2);
        assert_eq!(
            graph.get(SheetId(0)).unwrap().content(),
            "@import \"b.css\" layer(utilities);\n@import \"b.utilities.css\";\n.a {}\n"
        );
        assert_eq!(
            graph.get(SheetId(1)).unwrap().content(),
            "@import \"../b.css\" layer(utilities);\n@import \"../b.utilities.css\";\n"
        );

        let derived = graph.get(SheetId(3)).unwrap();
        let sources: Vec<&Path> = derived
            .import_edges
            .iter()
            .map(|edge| edge.source_file.as_path())
            .collect();
        assert_eq!(sources, vec![Path::new("/p/a.css"), Path::new("/p/nested/c.css")]);
    }

    #[test]
    fn test_import_inside_media_block() {
        let mut graph: StylesheetGraph = [
            sheet(
                "/p/a.css",
                "@media print {\n  @import \"b.css\" layer(utilities);\n}\n",
                &[],
            ),
            sheet("/p/b.css", "@utility btn {}\n", &["utilities"]),
        ]
        .into_iter()
        .collect();
        link(&mut graph, SheetId(0), SheetId(1));

        split(&mut graph, &config()).unwrap();
        assert_eq!(
            graph.get(SheetId(0)).unwrap().content(),
            "@media print {\n  @import \"b.css\" layer(utilities);\n  @import \"b.utilities.css\";\n}\n"
        );
    }

    #[test]
    fn test_importer_outside_graph_is_skipped() {
        let mut graph: StylesheetGraph = [
            sheet("/p/a.css", "@import \"b.css\" layer(utilities);\n", &[]),
            sheet("/p/b.css", "@utility btn {}\n.keep {}\n", &["utilities"]),
        ]
        .into_iter()
        .collect();
        link(&mut graph, SheetId(0), SheetId(1));
        // The edge points at a file that was never loaded
        graph.get_mut(SheetId(1)).unwrap().import_edges[0].source_file =
            PathBuf::from("/elsewhere/a.css");

        let report = split(&mut graph, &config()).unwrap();
        assert_eq!(report.derived.len(), 1);
        assert_eq!(report.derived[0].utilities, 1);
        assert_eq!(report.derived[0].imports, 0);
        assert_eq!(
            graph.get(SheetId(0)).unwrap().content(),
            "@import \"b.css\" layer(utilities);\n"
        );
        assert_eq!(graph.get(SheetId(1)).unwrap().content(), ".keep {}\n");
        assert!(graph.get(SheetId(2)).unwrap().import_edges.is_empty());
    }
}
