//! Stylesheets and the graph that owns them

use crate::error::LoadError;
use mill_css_ast::{parse, CssResult, NodeId, Tree};
use path_clean::PathClean;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Index of a stylesheet inside its [`StylesheetGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SheetId(pub usize);

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One `@import` site that pulls a stylesheet in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEdge {
    /// File containing the `@import` rule
    pub source_file: PathBuf,
    /// The `@import` node in the source sheet's tree
    pub rule: NodeId,
    /// Params of the rule as written
    pub params: String,
}

#[derive(Debug, Clone)]
pub struct Stylesheet {
    pub file: Option<PathBuf>,
    pub tree: Tree,
    /// Cascade layers this sheet was imported into, in discovery order
    pub layers: Vec<String>,
    /// Media expressions wrapping the import sites
    pub media: Vec<String>,
    pub import_edges: Vec<ImportEdge>,
    pub parents: BTreeSet<SheetId>,
}

impl Stylesheet {
    pub fn from_tree(tree: Tree, file: Option<PathBuf>) -> Self {
        Self {
            file: file.map(|path| path.clean()),
            tree,
            layers: Vec::new(),
            media: Vec::new(),
            import_edges: Vec::new(),
            parents: BTreeSet::new(),
        }
    }

    /// Parse `content`, attributing nodes to `file` when given
    pub fn parse(content: &str, file: Option<PathBuf>) -> CssResult<Self> {
        let file = file.map(|path| path.clean());
        let tree = parse(content, file.as_deref())?;
        Ok(Self::from_tree(tree, file))
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref().clean();
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(file = %path.display(), bytes = content.len(), "Loaded stylesheet");
        Ok(Self::parse(&content, Some(path))?)
    }

    /// Serialized tree
    pub fn content(&self) -> String {
        self.tree.to_css()
    }

    /// Record an import site. Returns `false` when the same site is already known.
    pub fn add_edge(&mut self, edge: ImportEdge) -> bool {
        let known = self
            .import_edges
            .iter()
            .any(|existing| existing.source_file == edge.source_file && existing.rule == edge.rule);
        if known {
            return false;
        }
        self.import_edges.push(edge);
        true
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.iter().any(|layer| layer == name)
    }

    pub fn display_name(&self) -> String {
        match &self.file {
            Some(path) => path.display().to_string(),
            None => "<inline>".to_string(),
        }
    }
}

/// Owning collection of stylesheets. Parents and edges refer to sheets by [`SheetId`].
#[derive(Debug, Clone, Default)]
pub struct StylesheetGraph {
    sheets: Vec<Stylesheet>,
}

impl StylesheetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sheet: Stylesheet) -> SheetId {
        let id = SheetId(self.sheets.len());
        self.sheets.push(sheet);
        id
    }

    pub fn get(&self, id: SheetId) -> Option<&Stylesheet> {
        self.sheets.get(id.0)
    }

    pub fn get_mut(&mut self, id: SheetId) -> Option<&mut Stylesheet> {
        self.sheets.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = SheetId> {
        (0..self.sheets.len()).map(SheetId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SheetId, &Stylesheet)> {
        self.sheets
            .iter()
            .enumerate()
            .map(|(index, sheet)| (SheetId(index), sheet))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SheetId, &mut Stylesheet)> {
        self.sheets
            .iter_mut()
            .enumerate()
            .map(|(index, sheet)| (SheetId(index), sheet))
    }

    pub fn find_by_file(&self, file: &Path) -> Option<SheetId> {
        let wanted = file.clean();
        self.sheets
            .iter()
            .position(|sheet| sheet.file.as_deref() == Some(wanted.as_path()))
            .map(SheetId)
    }

    pub fn into_sheets(self) -> Vec<Stylesheet> {
        self.sheets
    }

    pub fn summary(&self) -> GraphSummary {
        let sheets = self
            .sheets
            .iter()
            .map(|sheet| SheetSummary {
                file: sheet.file.clone(),
                layers: sheet.layers.clone(),
                media: sheet.media.clone(),
                imports: sheet.import_edges.len(),
                parents: sheet
                    .parents
                    .iter()
                    .map(|parent| match self.get(*parent) {
                        Some(parent_sheet) => parent_sheet.display_name(),
                        None => parent.to_string(),
                    })
                    .collect(),
            })
            .collect();
        GraphSummary { sheets }
    }
}

impl FromIterator<Stylesheet> for StylesheetGraph {
    fn from_iter<I: IntoIterator<Item = Stylesheet>>(iter: I) -> Self {
        Self {
            sheets: iter.into_iter().collect(),
        }
    }
}

/// Serializable view of a graph after analysis
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub sheets: Vec<SheetSummary>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SheetSummary {
    pub file: Option<PathBuf>,
    pub layers: Vec<String>,
    pub media: Vec<String>,
    /// Number of import sites pulling this sheet in
    pub imports: usize,
    pub parents: Vec<String>,
}
