use std::net::SocketAddr;
use std::sync::Arc;

use rag_responder::api::{create_router, queue, AppState};
use rag_responder::application::{KnowledgeIndex, Responder};
use rag_responder::infrastructure::{
    AppConfig, OpenAiCompletion, QdrantVectorStore, RedisCache, TextEmbedding,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    // Configuration faults are fatal: the process does not proceed.
    let config = AppConfig::from_env()?;

    let redis_pool = queue::create_pool(&config.redis_url)?;
    info!("Redis pool initialized");

    let embedding = Arc::new(TextEmbedding::from_env(&config.embedding));
    let vector_store = Arc::new(
        QdrantVectorStore::new(
            &config.qdrant_url,
            &config.collection,
            config.embedding.dimension,
        )
        .await?,
    );
    let index = Arc::new(KnowledgeIndex::new(embedding, vector_store));
    info!("Qdrant connected");

    let cache = Arc::new(RedisCache::new(redis_pool.clone()));
    let completion = Arc::new(OpenAiCompletion::from_env(&config.llm));
    let responder = Arc::new(
        Responder::new(
            index.clone(),
            completion,
            cache,
            config.persona.preamble.clone(),
            config.rag.top_k,
        )
        .with_ttls(config.rag.retrieval_ttl, config.rag.completion_ttl),
    );

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let state = AppState::new(redis_pool, responder, index, config);
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
