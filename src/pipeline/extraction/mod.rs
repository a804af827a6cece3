//! Extraction Pipeline: photographed test papers → one `ExtractionResult` per
//! file, plus the CSV export of the successful rows.
//!
//! Files are processed strictly one at a time. A failing file becomes an error
//! row and the batch carries on.

pub mod types;
pub mod prompt;
pub mod runner;
pub mod csv;

pub use types::*;
pub use prompt::*;
pub use runner::*;
pub use csv::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
