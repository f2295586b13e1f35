//! Error types for template loading and rendering.

use std::fmt;

use pagetree_core::Tree;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("invalid template key: {0}")]
    InvalidKey(String),

    #[error("failed to read template {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse template {key}: {source}")]
    Syntax {
        key: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("template {key} does not reference block {block:?}")]
    MissingSlot { key: String, block: String },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to render template: {0}")]
    Template(#[from] minijinja::Error),
}

/// A compiled node whose template could not be constructed.
#[derive(Debug)]
pub struct ExecutorError {
    pub node: Tree,
    pub error: TemplateError,
}

impl ExecutorError {
    pub fn new(node: &Tree, error: TemplateError) -> Self {
        ExecutorError {
            node: node.clone(),
            error,
        }
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node.extends() {
            Some(block) => write!(f, "{} (block {:?}): {}", self.node.template(), block, self.error),
            None => write!(f, "{}: {}", self.node.template(), self.error),
        }
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
