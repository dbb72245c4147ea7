//! Stylesheet graph upgrades
//!
//! Loads a set of stylesheets, recovers their import graph, migrates each
//! sheet with the codemod pipeline and finally moves `@utility` rules into
//! derived sibling sheets wired into the same graph.

pub mod split;
pub mod upgrade;

pub use split::{derived_path, derived_specifier, split, DerivedSheet, SplitError, SplitReport};
pub use upgrade::{
    load_graph, upgrade, upgrade_batch, upgrade_graph, Project, ProjectOutcome, ProjectStatus,
    RenderedSheet, SheetMigration, UpgradeOutput, UpgradeReport,
};
