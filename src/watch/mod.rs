// src/watch/mod.rs

//! File watching.
//!
//! - [`bindings`] compiles `[[watch]]` globs.
//! - [`watcher`] wires a recursive `notify` watcher on the project root.
//! - [`event_handler`] turns changed paths into [`WatchTrigger`]s.
//!
//! This module does not run tasks; the orchestrator decides what a trigger
//! starts.

pub mod bindings;
pub mod event_handler;
pub mod watcher;

pub use bindings::{compile_bindings, CompiledBinding};
pub use event_handler::{process_file_change, WatchTrigger};
pub use watcher::{spawn_watcher, WatcherHandle};
