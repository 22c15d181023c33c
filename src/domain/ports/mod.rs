mod cache;
mod completion;
mod delivery;
mod embedding;
mod vector_store;

pub use cache::Cache;
pub use completion::CompletionClient;
pub use delivery::DeliveryChannel;
pub use embedding::EmbeddingService;
pub use vector_store::VectorStore;
