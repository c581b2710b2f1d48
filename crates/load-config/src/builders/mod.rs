//! Builders for constructing configurations in code.

pub mod config;

pub use config::ConfigBuilder;
