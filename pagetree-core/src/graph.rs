//! The author-declared view/block graph.
//!
//! Views and blocks live in one arena and point at each other by index, so
//! the parent link of a block and the child list of a view never form a
//! reference cycle. The graph only grows: declaring a sub-view appends a new
//! view and, when needed, a new block on its parent, but never touches
//! sibling views.

use std::collections::BTreeMap;
use std::ops::Index;

use crate::handler::Handler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(usize);

/// A template key plus the handler that loads its data.
#[derive(Debug, Clone)]
pub struct View {
    template: String,
    handler: Handler,
    /// Block this view fills, `None` for a page root
    extends: Option<BlockId>,
    blocks: BTreeMap<String, BlockId>,
}

impl View {
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn extends(&self) -> Option<BlockId> {
        self.extends
    }

    /// Declared blocks in sorted name order.
    pub fn blocks(&self) -> impl Iterator<Item = (&str, BlockId)> + '_ {
        self.blocks.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn block(&self, name: &str) -> Option<BlockId> {
        self.blocks.get(name).copied()
    }
}

/// A named slot on a view that child views can extend.
#[derive(Debug, Clone)]
pub struct Block {
    name: String,
    container: ViewId,
    default: Option<ViewId>,
}

impl Block {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The view declaring this block.
    pub fn container(&self) -> ViewId {
        self.container
    }

    pub fn default(&self) -> Option<ViewId> {
        self.default
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewGraph {
    views: Vec<View>,
    blocks: Vec<Block>,
}

impl ViewGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root view, one that extends no block.
    pub fn new_view(&mut self, template: impl Into<String>, handler: Handler) -> ViewId {
        self.push_view(template.into(), handler, None)
    }

    /// Look up the block `name` on `view`, declaring it if it does not exist
    /// yet. Asking twice for the same name yields the same block.
    pub fn block(&mut self, view: ViewId, name: &str) -> BlockId {
        if let Some(id) = self.views[view.0].block(name) {
            return id;
        }
        let id = BlockId(self.blocks.len());
        self.blocks.push(Block {
            name: name.to_string(),
            container: view,
            default: None,
        });
        self.views[view.0].blocks.insert(name.to_string(), id);
        id
    }

    /// Create a new view extending block `block` of `parent`.
    ///
    /// Every call returns a new view, even for a block name that was used
    /// before; any number of views may extend the same block.
    pub fn sub_view(
        &mut self,
        parent: ViewId,
        block: &str,
        template: impl Into<String>,
        handler: Handler,
    ) -> ViewId {
        let block = self.block(parent, block);
        self.push_view(template.into(), handler, Some(block))
    }

    /// Like [`ViewGraph::sub_view`], and make the new view the block's
    /// default, replacing any earlier default.
    pub fn default_sub_view(
        &mut self,
        parent: ViewId,
        block: &str,
        template: impl Into<String>,
        handler: Handler,
    ) -> ViewId {
        let view = self.sub_view(parent, block, template, handler);
        if let Some(id) = self.views[view.0].extends {
            self.blocks[id.0].default = Some(view);
        }
        view
    }

    /// The view containing the block `view` extends.
    pub fn parent(&self, view: ViewId) -> Option<ViewId> {
        self[view].extends.map(|block| self[block].container)
    }

    /// Follow parent links up to the page root.
    pub fn root(&self, view: ViewId) -> ViewId {
        let mut current = view;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    fn push_view(&mut self, template: String, handler: Handler, extends: Option<BlockId>) -> ViewId {
        let id = ViewId(self.views.len());
        self.views.push(View {
            template,
            handler,
            extends,
            blocks: BTreeMap::new(),
        });
        id
    }
}

impl Index<ViewId> for ViewGraph {
    type Output = View;

    fn index(&self, id: ViewId) -> &View {
        &self.views[id.0]
    }
}

impl Index<BlockId> for ViewGraph {
    type Output = Block;

    fn index(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }
}
