//! Document ingestion for Capstone.
//!
//! Uploads are decoded into sections ([`decoder`]), split into overlapping
//! chunks ([`splitter`]), and written to the vector index in rate-limited
//! batches ([`pipeline`]).

pub mod decoder;
pub mod pipeline;
pub mod splitter;

pub use decoder::{DocumentFormat, load_document};
pub use pipeline::{BatchPolicy, IngestionPipeline};
pub use splitter::RecursiveSplitter;
