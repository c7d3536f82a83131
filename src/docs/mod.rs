pub mod chunker;
pub mod source;
pub mod types;

pub use chunker::Chunker;
pub use source::{DirectorySource, DocumentSource, StaticSource, UrlTemplate};
pub use types::{Chunk, Document};
