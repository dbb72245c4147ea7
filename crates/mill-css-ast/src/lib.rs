//! mill-css-ast: lossless CSS trees for the stylesheet upgrader
//!
//! Parsing keeps every byte of the input in node payloads or raws, so a tree
//! that was never touched prints back to exactly the text it was parsed from.
//! Nodes carry their source file and position, can be cloned with payload
//! overrides, moved, replaced and removed in place, and traversed with
//! continue/skip/stop control.

pub mod error;
pub mod node;
pub mod parser;
pub mod printer;
pub mod tree;

pub use error::{CssError, CssResult, Location};
pub use node::{
    AtRule, Comment, Decl, MarkerId, NodeData, NodeId, NodeKind, Raws, Rule, Source,
};
pub use parser::parse;
pub use tree::{Overrides, Tree, WalkControl};
