//! # pagetree-render
//!
//! Turns compiled view trees into executable templates.
//!
//! Template text comes from a pluggable [`TemplateSource`]; each tree is
//! loaded, parsed and checked for missing block references once, producing a
//! [`TemplateSet`] that renders the tree's data.

pub mod error;
pub mod set;
pub mod slots;
pub mod source;

pub use error::{ExecutorError, RenderError, TemplateError};
pub use set::TemplateSet;
pub use source::{FileSystem, KeyedStrings, TemplateSource};
