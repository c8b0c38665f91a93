//! Memory models
//!
//! Documents mirror one authored source entity each; chunks are their
//! paragraph-sized slices with embedding vectors.

mod chunk;
mod document;
mod source_type;

pub use chunk::Chunk;
pub use document::Document;
pub use source_type::SourceType;
