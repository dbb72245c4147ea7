//! Stylesheet import-graph analysis
//!
//! Flattening `@import` rules loses track of which file each node came from.
//! This crate seeds marker nodes into every tree before flattening, reads
//! them back from the flattened result, and records the recovered file
//! identity, cascade layers, media and parents on each [`Stylesheet`].

pub mod analyzer;
pub mod error;
pub mod markers;
pub mod params;
pub mod resolver;
pub mod stylesheet;

pub use analyzer::{analyze, AnalysisReport, ProvenanceIssue};
pub use error::{AnalysisError, AnalysisResult, LoadError, ResolveError};
pub use markers::{FileMarker, ImportMarker, Marker, MarkerSet};
pub use params::{parse_import_params, url_path, ImportParams};
pub use resolver::{FlattenHooks, FsImportResolver, ImportResolver, NoHooks};
pub use stylesheet::{GraphSummary, ImportEdge, SheetId, SheetSummary, Stylesheet, StylesheetGraph};
