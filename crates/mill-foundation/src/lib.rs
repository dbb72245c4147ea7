//! Foundation layer for the stylesheet upgrader
//!
//! Holds the error taxonomy every stage converts into, so the upgrade driver
//! and batch runner can report failures without knowing which stage raised
//! them.

pub mod error;

pub use error::*;
