//! Decide which view fills a block.

use std::collections::{BTreeMap, BTreeSet};

use crate::graph::{BlockId, ViewGraph, ViewId};

/// The outcome of resolving one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The request's target view extends the block.
    Primary(ViewId),
    /// An explicit include extends the block.
    Include(ViewId),
    /// The block's declared default.
    Default(ViewId),
    /// Nothing fills the block: no template, no data.
    Empty,
}

impl Fill {
    pub fn view(self) -> Option<ViewId> {
        match self {
            Fill::Primary(v) | Fill::Include(v) | Fill::Default(v) => Some(v),
            Fill::Empty => None,
        }
    }
}

/// Node-local block resolution against a primary view and a set of
/// includes.
///
/// The resolver remembers every block it handed to the primary view or an
/// include, so the compiler can tell which includes were already rendered
/// as part of a tree.
#[derive(Debug, Clone)]
pub struct Resolver<'g> {
    graph: &'g ViewGraph,
    primary: Option<ViewId>,
    includes: BTreeMap<BlockId, ViewId>,
    consumed: BTreeSet<BlockId>,
}

impl<'g> Resolver<'g> {
    /// Includes that are page roots are ignored here; when two includes
    /// extend the same block the first one listed wins.
    pub fn new(graph: &'g ViewGraph, primary: Option<ViewId>, includes: &[ViewId]) -> Self {
        let mut by_block = BTreeMap::new();
        for &include in includes {
            if let Some(block) = graph[include].extends() {
                by_block.entry(block).or_insert(include);
            }
        }
        Resolver {
            graph,
            primary,
            includes: by_block,
            consumed: BTreeSet::new(),
        }
    }

    pub fn graph(&self) -> &'g ViewGraph {
        self.graph
    }

    pub fn fill(&mut self, block: BlockId) -> Fill {
        if let Some(primary) = self.primary {
            if self.graph[primary].extends() == Some(block) {
                self.consumed.insert(block);
                return Fill::Primary(primary);
            }
        }
        if let Some(&include) = self.includes.get(&block) {
            self.consumed.insert(block);
            return Fill::Include(include);
        }
        match self.graph[block].default() {
            Some(view) => Fill::Default(view),
            None => Fill::Empty,
        }
    }

    pub fn is_consumed(&self, block: BlockId) -> bool {
        self.consumed.contains(&block)
    }

    pub fn consumed(&self) -> &BTreeSet<BlockId> {
        &self.consumed
    }
}
