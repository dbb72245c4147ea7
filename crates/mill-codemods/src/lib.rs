//! Stylesheet codemods
//!
//! Each codemod is an independent rewrite of one [`Stylesheet`](mill_analysis_imports::Stylesheet)
//! that moves legacy utility-framework syntax to the current one. The
//! [`Pipeline`] runs them in a fixed order, finishing with formatting of the
//! nodes the earlier passes created.

pub mod codemods;
pub mod error;
pub mod pipeline;

pub use codemods::{default_codemods, Codemod};
pub use error::{CodemodError, CodemodResult};
pub use pipeline::{migrate, migrate_contents, CodemodRun, Pipeline};
