// src/config/mod.rs

//! Configuration: TOML model, loading, validation and built-in presets.

pub mod loader;
pub mod model;
pub mod presets;
pub mod validate;

pub use loader::{load_and_validate, resolve, ConfigSource};
pub use model::{
    ConfigFile, RawConfigFile, SequenceItem, ServerSection, TaskConfig, WatchConfig,
};
