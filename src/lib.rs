pub mod error;
pub mod opts;

mod extract;

pub use extract::{extract, ExtractionRequest, Size};
