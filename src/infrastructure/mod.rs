pub mod cache;
pub mod completion;
pub mod config;
pub mod delivery;
pub mod embedding;
pub mod queue;
pub mod vector_store;

pub use cache::{InMemoryCache, RedisCache};
pub use completion::OpenAiCompletion;
pub use config::{AppConfig, PersonaConfig};
pub use delivery::{ConsoleDelivery, EmailDelivery, SocketDelivery};
pub use embedding::TextEmbedding;
pub use queue::{
    keys, queues, BatchRespondJob, JobResult, QueueJobStatus, RespondJob,
};
pub use vector_store::{InMemoryVectorStore, QdrantVectorStore};
