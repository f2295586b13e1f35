//! Build view handlers from a view graph.
//!
//! An [`Executor`] compiles views and constructs their templates up front.
//! Construction problems are not returned from [`Executor::view_handler`];
//! they pile up inside the executor until [`Executor::flush_errors`] drains
//! them, which the integrator must do before serving traffic. A handler whose
//! page or partial templates failed still serves whatever did build.

use std::sync::Arc;

use pagetree_core::{compile, ResponseIds, ViewGraph, ViewId};
use pagetree_render::{ExecutorError, TemplateSet, TemplateSource};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::dispatch::{Accepts, Part, ViewHandler};

pub struct Executor {
    source: Arc<dyn TemplateSource>,
    ids: Arc<ResponseIds>,
    errors: Mutex<Vec<ExecutorError>>,
    developer: bool,
}

impl Executor {
    /// Templates are loaded and checked once, when each handler is built.
    pub fn new(source: impl TemplateSource + 'static) -> Self {
        Self::from_source(Arc::new(source), false)
    }

    /// Templates are reloaded from `source` on every request, so edits show
    /// up without a restart. Broken templates produce a diagnostic page.
    pub fn developer(source: impl TemplateSource + 'static) -> Self {
        Self::from_source(Arc::new(source), true)
    }

    pub fn from_source(source: Arc<dyn TemplateSource>, developer: bool) -> Self {
        Executor {
            source,
            ids: Arc::new(ResponseIds::new()),
            errors: Mutex::new(Vec::new()),
            developer,
        }
    }

    /// Share a response id sequence with other executors of the same server.
    pub fn with_ids(mut self, ids: Arc<ResponseIds>) -> Self {
        self.ids = ids;
        self
    }

    pub fn ids(&self) -> &Arc<ResponseIds> {
        &self.ids
    }

    pub fn is_developer(&self) -> bool {
        self.developer
    }

    pub fn view_handler(&self, graph: &ViewGraph, view: ViewId) -> ViewHandler {
        self.view_handler_with_includes(graph, view, &[])
    }

    /// A handler for `view` whose partial and fragment responses also render
    /// `includes`.
    pub fn view_handler_with_includes(
        &self,
        graph: &ViewGraph,
        view: ViewId,
        includes: &[ViewId],
    ) -> ViewHandler {
        let compiled = compile(graph, view, includes);
        debug!(
            view = compiled.partial.template(),
            page = ?compiled.page.templates(),
            includes = compiled.includes.len(),
            "compiled view"
        );

        let page = self.part(compiled.page);
        let partial = self.part(compiled.partial);
        let includes = compiled
            .includes
            .into_iter()
            .map(|tree| self.part(tree))
            .filter(|part| {
                let ok = self.developer || part.set.is_some();
                if !ok {
                    warn!(template = part.tree.template(), "dropping include with broken templates");
                }
                ok
            })
            .collect();

        ViewHandler {
            page,
            partial,
            includes,
            accepts: Accepts::Any,
            ids: self.ids.clone(),
            developer: self.developer.then(|| self.source.clone()),
        }
    }

    /// Drain the construction errors collected so far.
    pub fn flush_errors(&self) -> Vec<ExecutorError> {
        std::mem::take(&mut *self.errors.lock())
    }

    fn part(&self, tree: pagetree_core::Tree) -> Part {
        if self.developer {
            return Part { tree, set: None };
        }
        match TemplateSet::build(&tree, self.source.as_ref()) {
            Ok(set) => Part {
                tree,
                set: Some(set),
            },
            Err(errors) => {
                self.errors.lock().extend(errors);
                Part { tree, set: None }
            }
        }
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("developer", &self.developer)
            .field("errors", &self.errors.lock().len())
            .finish()
    }
}
