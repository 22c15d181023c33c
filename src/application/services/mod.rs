mod index;
mod responder;

pub use index::KnowledgeIndex;
pub use responder::{BatchItem, Responder};
