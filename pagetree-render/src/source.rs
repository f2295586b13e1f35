//! Where template text comes from.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::TemplateError;

/// Maps a template key to template text.
pub trait TemplateSource: Send + Sync {
    fn load(&self, key: &str) -> Result<String, TemplateError>;
}

impl<F> TemplateSource for F
where
    F: Fn(&str) -> Result<String, TemplateError> + Send + Sync,
{
    fn load(&self, key: &str) -> Result<String, TemplateError> {
        self(key)
    }
}

/// Template text held in memory, keyed by template key.
#[derive(Debug, Clone, Default)]
pub struct KeyedStrings {
    templates: HashMap<String, String>,
}

impl KeyedStrings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.templates.insert(key.into(), text.into());
        self
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for KeyedStrings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        KeyedStrings {
            templates: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl TemplateSource for KeyedStrings {
    fn load(&self, key: &str) -> Result<String, TemplateError> {
        self.templates
            .get(key)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(key.to_string()))
    }
}

/// Template files below a root directory; keys are relative paths.
#[derive(Debug, Clone)]
pub struct FileSystem {
    root: PathBuf,
}

impl FileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileSystem { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, TemplateError> {
        let rel = Path::new(key);
        // only plain relative segments, nothing that could escape the root
        let clean = !key.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !clean {
            return Err(TemplateError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl TemplateSource for FileSystem {
    fn load(&self, key: &str) -> Result<String, TemplateError> {
        let path = self.resolve(key)?;
        std::fs::read_to_string(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => TemplateError::NotFound(key.to_string()),
            _ => TemplateError::Io {
                key: key.to_string(),
                source,
            },
        })
    }
}
