//! Advice Pipeline: one free-text study question → one `AdviceResponse`.
//!
//! Any failure fails the whole query; there is no partial advice.

pub mod types;
pub mod prompt;
pub mod runner;

pub use types::*;
pub use prompt::*;
pub use runner::*;
