pub mod config;
pub mod logging;

pub mod adapter;
pub mod catalog;
pub mod control;
pub mod engine;
pub mod error;
pub mod output;
pub mod pool;
pub mod prefs;
pub mod queue;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use engine::Engine;
pub use error::{AdapterError, EngineError, WriteError};
