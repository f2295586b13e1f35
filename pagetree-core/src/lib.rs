//! # pagetree-core
//!
//! Compose one HTML page out of independently owned views.
//!
//! Views declare named blocks that other views extend. [`compile`] turns a
//! leaf view into a full page tree, a partial tree rooted at the leaf and
//! any extra include trees. At request time the handlers of the selected
//! tree run as a cascade through [`Response`], collecting data and status.

pub mod compile;
pub mod graph;
pub mod handler;
pub mod ids;
pub mod negotiate;
pub mod resolve;
pub mod response;
pub mod status;

pub use compile::{compile, compile_view, Compiled, Tree};
pub use graph::{Block, BlockId, View, ViewGraph, ViewId};
pub use handler::{constant, delegate, request_handler, Handler};
pub use ids::ResponseIds;
pub use negotiate::{redirect, redirect_response, RequestKind};
pub use resolve::{Fill, Resolver};
pub use response::{Outcome, PageUrl, Response, ResponseState};
pub use status::merge_status;

/// Requests as handlers see them, body already buffered.
pub type Request = http::Request<bytes::Bytes>;
