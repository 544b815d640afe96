// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`backend`] provides the `ExecutorBackend` trait the runtime dispatches
//!   through; tests replace it with a fake implementation.
//! - [`action`] is the production backend: pipelines, `clean`, `serve`, and
//!   the post-success live-reload side effect.

pub mod action;
pub mod backend;

pub use action::{ActionContext, ActionExecutor};
pub use backend::ExecutorBackend;
