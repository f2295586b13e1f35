//! Executable templates for a compiled tree.
//!
//! Every node of the tree is registered in one MiniJinja environment under a
//! name derived from its block path, so the same block name may appear in
//! different branches without clashing. A template pulls in a child block
//! with `{{ block("name", data.child) }}`; the child template is executed with
//! the given value bound to `data`. Blocks filled by nothing render as the
//! empty string.

use minijinja::value::Value;
use minijinja::{context, AutoEscape, Environment, ErrorKind, State};
use pagetree_core::Tree;
use tracing::debug;

use crate::error::{ExecutorError, RenderError, TemplateError};
use crate::slots;
use crate::source::TemplateSource;

const ROOT: &str = "@";

pub struct TemplateSet {
    env: Environment<'static>,
    templates: Vec<String>,
}

impl TemplateSet {
    /// Load, parse and slot-check the template of every node in `tree`.
    /// All failures are collected, not just the first.
    pub fn build(tree: &Tree, source: &dyn TemplateSource) -> Result<Self, Vec<ExecutorError>> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_function("block", block);

        let mut errors = Vec::new();
        add_node(&mut env, tree, ROOT.to_string(), source, &mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }
        debug!(root = tree.template(), nodes = tree.templates().len(), "template set built");
        Ok(TemplateSet {
            env,
            templates: tree.templates().into_iter().map(String::from).collect(),
        })
    }

    /// The flattened template key list this set was built from.
    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    /// Execute the tree's templates with the root handler's data.
    pub fn render(&self, data: &serde_json::Value) -> Result<String, RenderError> {
        match self.env.get_template(ROOT) {
            Ok(tmpl) => Ok(tmpl.render(context! { data => Value::from_serialize(data) })?),
            Err(e) if e.kind() == ErrorKind::TemplateNotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("templates", &self.templates)
            .finish()
    }
}

fn add_node(
    env: &mut Environment<'static>,
    tree: &Tree,
    name: String,
    source: &dyn TemplateSource,
    errors: &mut Vec<ExecutorError>,
) {
    let key = tree.template();
    if !key.is_empty() {
        match source.load(key) {
            Ok(text) => {
                for block in slots::missing(&text, tree.blocks().map(|(n, _)| n)) {
                    errors.push(ExecutorError::new(
                        tree,
                        TemplateError::MissingSlot {
                            key: key.to_string(),
                            block: block.to_string(),
                        },
                    ));
                }
                if let Err(source) = env.add_template_owned(name.clone(), text) {
                    errors.push(ExecutorError::new(
                        tree,
                        TemplateError::Syntax {
                            key: key.to_string(),
                            source,
                        },
                    ));
                }
            }
            Err(error) => errors.push(ExecutorError::new(tree, error)),
        }
    }
    for (block, child) in tree.blocks() {
        add_node(env, child, format!("{name}/{block}"), source, errors);
    }
}

/// `block(name, data)`: render the child filling `name` of the calling
/// template.
fn block(state: &State, name: &str, data: Option<Value>) -> Result<Value, minijinja::Error> {
    let child = format!("{}/{}", state.name(), name);
    match state.env().get_template(&child) {
        Ok(tmpl) => {
            let html = tmpl.render(context! { data => data.unwrap_or_default() })?;
            Ok(Value::from_safe_string(html))
        }
        Err(e) if e.kind() == ErrorKind::TemplateNotFound => Ok(Value::from_safe_string(String::new())),
        Err(e) => Err(e),
    }
}
