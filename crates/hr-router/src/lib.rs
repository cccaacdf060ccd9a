//! Intent router.
//!
//! Sits on top of the ensemble classifier and decides, per request,
//! whether to dispatch to a handler, run the fallback, or ask the caller
//! for clarification:
//! - `Handler` trait (plus `handler_fn` for closures)
//! - `HandlerRegistry`, intent name → handler, plus the routing hooks
//! - `Middleware` and `ClarificationHandler` hooks around classification
//! - `Router`, the routing pipeline and its introspection helpers

pub mod builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod hooks;
pub mod registry;
pub mod result;
pub mod router;

pub use builder::HandlerBuilder;
pub use config::RouterConfig;
pub use error::RouterError;
pub use handler::{Context, FnHandler, Handler, handler_fn};
pub use hooks::{
    ClarificationHandler, FnClarification, FnMiddleware, Middleware, clarification_fn,
    middleware_fn,
};
pub use registry::{HandlerEntry, HandlerInfo, HandlerRegistry};
pub use result::{Clarification, RouteStatus, RouterResult};
pub use router::{Coverage, FALLBACK_HANDLER, Router};
