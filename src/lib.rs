//! Question answering over a documentation corpus: chunk and embed documents,
//! rank passages against a question, and ground a chat completion on them
//! with ordered provider fallback.

pub mod answer;
pub mod config;
pub mod docs;
pub mod error;
pub mod index;
pub mod llm;
pub mod state;

pub use answer::{Answer, DocsAssistant};
pub use config::Settings;
pub use error::{Error, Result};
