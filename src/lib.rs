// src/lib.rs
pub mod columns;
pub mod dataset;
pub mod error;
pub mod input_format;
pub mod output_format;
pub mod pipeline;
pub mod store;

pub use error::*;
pub use pipeline::*;

pub use columns::resolve_column;
pub use dataset::{Cell, Dataset, Record};
pub use input_format::{load_path, load_source, InputSource, TextEncoding};
pub use store::{ArtifactLocation, ArtifactStore, DirStore, MemoryStore};
