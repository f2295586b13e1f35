//! Compile a leaf view into immutable page, partial and include trees.
//!
//! Compiled trees carry no back-pointers: each node owns its children, keyed
//! by block name and kept in sorted order, so walking a tree always visits
//! blocks in the same order.

use std::collections::BTreeSet;

use crate::graph::{BlockId, ViewGraph, ViewId};
use crate::handler::Handler;
use crate::resolve::Resolver;

/// One node of a compiled view tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    template: String,
    handler: Handler,
    /// Name of the block this node fills, `None` for a page root
    extends: Option<String>,
    blocks: Vec<(String, Tree)>,
}

impl Tree {
    /// The placeholder for a block nothing fills.
    pub fn empty(block: impl Into<String>) -> Tree {
        Tree {
            template: String::new(),
            handler: Handler::noop(),
            extends: Some(block.into()),
            blocks: Vec::new(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn extends(&self) -> Option<&str> {
        self.extends.as_deref()
    }

    /// Child blocks in sorted name order.
    pub fn blocks(&self) -> impl Iterator<Item = (&str, &Tree)> + '_ {
        self.blocks.iter().map(|(name, tree)| (name.as_str(), tree))
    }

    pub fn block(&self, name: &str) -> Option<&Tree> {
        self.blocks
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
            .ok()
            .map(|i| &self.blocks[i].1)
    }

    pub fn is_empty(&self) -> bool {
        self.template.is_empty() && self.handler.is_noop() && self.blocks.is_empty()
    }

    /// Template keys of this node and all descendants, depth first in block
    /// name order, skipping empty fills.
    pub fn templates(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_templates(&mut out);
        out
    }

    fn collect_templates<'a>(&'a self, out: &mut Vec<&'a str>) {
        if !self.template.is_empty() {
            out.push(&self.template);
        }
        for (_, child) in &self.blocks {
            child.collect_templates(out);
        }
    }
}

/// Everything compiled for one leaf view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    /// Full document, rooted at the page root.
    pub page: Tree,
    /// Subtree rooted at the leaf.
    pub partial: Tree,
    /// Includes the partial does not already render, in the order given.
    pub includes: Vec<Tree>,
}

/// Compile `leaf` and the extra `includes` rendered alongside it.
pub fn compile(graph: &ViewGraph, leaf: ViewId, includes: &[ViewId]) -> Compiled {
    let mut resolver = Resolver::new(graph, Some(leaf), includes);
    let partial = resolve_view(&mut resolver, leaf, None);
    // blocks on the path to the root are taken by the leaf and its ancestors
    let mut covered = resolver.consumed().clone();

    let mut page = partial.clone();
    let mut current = leaf;
    while let Some(block) = graph[current].extends() {
        covered.insert(block);
        let parent = graph[block].container();
        page = resolve_view(&mut resolver, parent, Some((block, page)));
        current = parent;
    }

    Compiled {
        page,
        partial,
        includes: include_trees(graph, leaf, includes, covered),
    }
}

/// Compile a single view with no overrides beyond itself, its blocks
/// filled by their defaults.
pub fn compile_view(graph: &ViewGraph, view: ViewId) -> Tree {
    let mut resolver = Resolver::new(graph, Some(view), &[]);
    resolve_view(&mut resolver, view, None)
}

fn include_trees(
    graph: &ViewGraph,
    leaf: ViewId,
    includes: &[ViewId],
    mut covered: BTreeSet<BlockId>,
) -> Vec<Tree> {
    let mut trees = Vec::new();
    for &include in includes {
        if include == leaf {
            continue;
        }
        if let Some(block) = graph[include].extends() {
            // marks the block so a second include for it is skipped too
            if !covered.insert(block) {
                tracing::debug!(
                    template = graph[include].template(),
                    block = graph[block].name(),
                    "include already covered"
                );
                continue;
            }
        }
        trees.push(compile_view(graph, include));
    }
    trees
}

/// Build the tree for `view`, resolving each block before recursing into
/// whatever fills it. `substitute` supplies an already compiled child for
/// one block, used while walking from the leaf up to the page root.
fn resolve_view(resolver: &mut Resolver<'_>, view: ViewId, substitute: Option<(BlockId, Tree)>) -> Tree {
    let graph = resolver.graph();
    let node = &graph[view];
    let mut substitute = substitute;
    let mut blocks = Vec::new();

    for (name, block) in node.blocks() {
        let child = match substitute.take() {
            Some((target, tree)) if target == block => tree,
            other => {
                substitute = other;
                match resolver.fill(block).view() {
                    Some(fill) => resolve_view(resolver, fill, None),
                    None => Tree::empty(name),
                }
            }
        };
        blocks.push((name.to_string(), child));
    }

    Tree {
        template: node.template().to_string(),
        handler: node.handler().clone(),
        extends: node.extends().map(|b| graph[b].name().to_string()),
        blocks,
    }
}
