use crate::error::CodemodResult;
use mill_analysis_imports::Stylesheet;
use mill_css_ast::{NodeId, Tree};

pub mod at_apply;
pub mod at_layer_utilities;
pub mod format_nodes;
pub mod missing_layers;
pub mod tailwind_directives;

pub use at_apply::MigrateAtApply;
pub use at_layer_utilities::MigrateAtLayerUtilities;
pub use format_nodes::FormatNodes;
pub use missing_layers::MigrateMissingLayers;
pub use tailwind_directives::MigrateTailwindDirectives;

/// One rewrite pass over a single stylesheet
pub trait Codemod: Send + Sync {
    /// Stable identifier used in logs and errors
    fn id(&self) -> &'static str;

    /// Rewrite `sheet` in place, returning how many nodes changed
    fn apply(&self, sheet: &mut Stylesheet) -> CodemodResult<usize>;
}

/// The passes in the order they must run; formatting is last
pub fn default_codemods() -> Vec<Box<dyn Codemod>> {
    vec![
        Box::new(MigrateAtApply),
        Box::new(MigrateAtLayerUtilities),
        Box::new(MigrateMissingLayers),
        Box::new(MigrateTailwindDirectives),
        Box::new(FormatNodes),
    ]
}

/// `@layer <name> { ... }`
pub(crate) fn is_layer_block(tree: &Tree, node: NodeId, name: &str) -> bool {
    tree.at_rule(node).is_some_and(|at_rule| {
        at_rule.block
            && at_rule.name.eq_ignore_ascii_case("layer")
            && at_rule.params.trim() == name
    })
}
