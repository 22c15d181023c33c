mod answer;
mod cache_key;
mod chunk;
mod embedding;
mod request;

pub use answer::{DeliveryReceipt, GeneratedAnswer};
pub use cache_key::{CacheKey, OperationKind};
pub use chunk::{chunk_text, KnowledgeChunk, ScoredChunk};
pub use embedding::Embedding;
pub use request::RespondRequest;
