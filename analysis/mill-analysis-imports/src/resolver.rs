//! Import flattening
//!
//! A resolver replaces every resolvable `@import` with the content of the
//! imported file, wrapped in `@media`, `@supports` and `@layer` blocks as the
//! import params ask. Package specifiers and URLs with a scheme are left alone.

use crate::error::ResolveError;
use crate::params::{parse_import_params, url_path, ImportParams};
use mill_css_ast::{parse, AtRule, NodeId, NodeKind, Tree};
use path_clean::PathClean;
use std::path::{Path, PathBuf};

/// Callbacks the resolver makes while flattening
pub trait FlattenHooks {
    /// Tree to use for `file` instead of reading it from disk
    fn load(&mut self, file: &Path) -> Option<Tree>;

    /// Called once for every file the resolver enters, before its own imports are inlined.
    /// `from_disk` is true when the tree was read by the resolver rather than supplied by `load`.
    fn on_enter(&mut self, file: &Path, tree: &mut Tree, from_disk: bool);
}

/// Hooks that change nothing
pub struct NoHooks;

impl FlattenHooks for NoHooks {
    fn load(&mut self, _file: &Path) -> Option<Tree> {
        None
    }

    fn on_enter(&mut self, _file: &Path, _tree: &mut Tree, _from_disk: bool) {}
}

pub trait ImportResolver: Send + Sync {
    /// Inline the imports of `tree`, the content of `file` (`None` for in-memory sheets)
    fn flatten(
        &self,
        tree: Tree,
        file: Option<&Path>,
        hooks: &mut dyn FlattenHooks,
    ) -> Result<Tree, ResolveError>;
}

/// Resolves relative imports against the file system
#[derive(Debug, Clone)]
pub struct FsImportResolver {
    /// Base for imports of in-memory sheets
    base_dir: PathBuf,
}

impl Default for FsImportResolver {
    fn default() -> Self {
        Self::new(".")
    }
}

impl FsImportResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Absolute location of `url` imported from `importer`
    pub fn resolve_path(&self, importer: Option<&Path>, url: &str) -> PathBuf {
        let relative = Path::new(url_path(url));
        if relative.is_absolute() {
            return relative.clean();
        }
        let dir = importer
            .and_then(Path::parent)
            .unwrap_or(self.base_dir.as_path());
        dir.join(relative).clean()
    }

    fn inline_imports(
        &self,
        tree: &mut Tree,
        file: Option<&Path>,
        hooks: &mut dyn FlattenHooks,
        stack: &mut Vec<PathBuf>,
    ) -> Result<(), ResolveError> {
        for rule in tree.at_rules("import") {
            let Some(at_rule) = tree.at_rule(rule) else {
                continue;
            };
            let params = parse_import_params(&at_rule.params);
            if is_external(&params.url) {
                continue;
            }

            let path = self.resolve_path(file, &params.url);
            if stack.contains(&path) {
                tracing::debug!(
                    file = %path.display(),
                    "Import cycle, leaving @import unresolved"
                );
                continue;
            }

            let (mut child, from_disk) = match hooks.load(&path) {
                Some(loaded) => (loaded, false),
                None => (read_tree(&path, file)?, true),
            };
            hooks.on_enter(&path, &mut child, from_disk);

            stack.push(path.clone());
            let inlined = self.inline_imports(&mut child, Some(&path), hooks, stack);
            stack.pop();
            inlined?;

            let nodes = tree.import_children(&child);
            let replacement = wrap(tree, nodes, &params);
            for node in replacement {
                tree.insert_before(rule, node);
            }
            tree.remove(rule);
            tracing::trace!(file = %path.display(), "Inlined import");
        }
        Ok(())
    }
}

impl ImportResolver for FsImportResolver {
    fn flatten(
        &self,
        mut tree: Tree,
        file: Option<&Path>,
        hooks: &mut dyn FlattenHooks,
    ) -> Result<Tree, ResolveError> {
        let mut stack: Vec<PathBuf> = file.map(|path| path.clean()).into_iter().collect();
        self.inline_imports(&mut tree, file, hooks, &mut stack)?;
        Ok(tree)
    }
}

/// URLs with a scheme and bare package specifiers. A bare specifier whose last
/// segment has a file extension (`b.pcss`, `b.css?v=1`) is a sibling file.
pub fn is_external(url: &str) -> bool {
    if url.is_empty() || url.starts_with("//") || has_scheme(url) {
        return true;
    }
    let path = url_path(url);
    if path.starts_with('.') || path.starts_with('/') {
        return false;
    }
    let name = path.rsplit('/').next().unwrap_or(path);
    !name.rfind('.').is_some_and(|dot| dot > 0)
}

/// `scheme:` prefix as in `https://..` or `data:..`
fn has_scheme(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
}

fn read_tree(path: &Path, importer: Option<&Path>) -> Result<Tree, ResolveError> {
    let content = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ResolveError::NotFound {
                path: path.to_path_buf(),
                importer: importer
                    .map(|file| file.display().to_string())
                    .unwrap_or_else(|| "<inline>".to_string()),
            }
        } else {
            ResolveError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    parse(&content, Some(path)).map_err(|source| ResolveError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Wrap `nodes` in `@layer` (innermost), `@supports` and `@media` (outermost) blocks
fn wrap(tree: &mut Tree, nodes: Vec<NodeId>, params: &ImportParams) -> Vec<NodeId> {
    let mut nodes = nodes;
    if !params.layers.is_empty() || params.anonymous_layer {
        nodes = vec![block(tree, "layer", params.layers.join(", "), nodes)];
    }
    if let Some(condition) = &params.supports {
        nodes = vec![block(tree, "supports", format!("({})", condition), nodes)];
    }
    if let Some(media) = &params.media {
        nodes = vec![block(tree, "media", media.clone(), nodes)];
    }
    nodes
}

fn block(tree: &mut Tree, name: &str, params: String, nodes: Vec<NodeId>) -> NodeId {
    let wrapper = tree.create(NodeKind::AtRule(AtRule::block(name, params)));
    for node in nodes {
        tree.append(wrapper, node);
    }
    wrapper
}
