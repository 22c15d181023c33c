use std::sync::Arc;
use std::time::Duration;

use deadpool_redis::{redis::AsyncCommands, Config, Connection, Pool, Runtime};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rag_responder::application::{KnowledgeIndex, Responder};
use rag_responder::domain::ports::DeliveryChannel;
use rag_responder::infrastructure::{
    queues, AppConfig, BatchRespondJob, EmailDelivery, JobResult, OpenAiCompletion,
    QdrantVectorStore, RedisCache, RespondJob, TextEmbedding,
};

pub type RedisPool = Pool;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Redis pool error: {0}")]
    Pool(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WorkerError>;

pub fn create_pool(redis_url: &str) -> Result<RedisPool> {
    let cfg = Config::from_url(redis_url);
    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| WorkerError::Pool(e.to_string()))
}

pub struct WorkerState {
    pub redis_pool: RedisPool,
    pub responder: Arc<Responder>,
    pub mailer: Option<Arc<EmailDelivery>>,
    pub result_ttl: Duration,
}

impl WorkerState {
    pub async fn new(redis_pool: RedisPool, config: &AppConfig) -> anyhow::Result<Self> {
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

        let cache = Arc::new(RedisCache::new(redis_pool.clone()));
        let completion = Arc::new(OpenAiCompletion::from_env(&config.llm));
        let responder = Arc::new(
            Responder::new(
                index,
                completion,
                cache,
                config.persona.preamble.clone(),
                config.rag.top_k,
            )
            .with_ttls(config.rag.retrieval_ttl, config.rag.completion_ttl),
        );

        let mailer = config
            .mail
            .as_ref()
            .map(|mail| Arc::new(EmailDelivery::new(mail)));

        Ok(Self {
            redis_pool,
            responder,
            mailer,
            result_ttl: config.worker.result_ttl,
        })
    }
}

pub struct JobConsumer {
    state: Arc<WorkerState>,
    concurrency: usize,
}

impl JobConsumer {
    pub fn new(state: WorkerState, concurrency: usize) -> Self {
        Self {
            state: Arc::new(state),
            concurrency,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        tracing::info!(concurrency = self.concurrency, "consumer started");

        loop {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let state = self.state.clone();

            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = process_next_job(&state).await {
                    tracing::error!(error = %e, "job failed");
                }
            });

            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }

        Ok(())
    }
}

async fn conn(state: &WorkerState) -> Result<Connection> {
    state
        .redis_pool
        .get()
        .await
        .map_err(|e| WorkerError::Pool(e.to_string()))
}

async fn set_status(
    conn: &mut Connection,
    state: &WorkerState,
    job_id: uuid::Uuid,
    status: &JobResult,
) -> Result<()> {
    let json = serde_json::to_string(status)?;
    conn.set_ex::<_, _, ()>(
        rag_responder::infrastructure::keys::job_status(&job_id),
        &json,
        state.result_ttl.as_secs(),
    )
    .await
    .map_err(|e| WorkerError::Redis(e.to_string()))
}

async fn process_next_job(state: &WorkerState) -> Result<()> {
    let mut c = conn(state).await?;

    let result: Option<(String, String)> = c
        .brpop(&[queues::RESPOND_QUEUE, queues::BATCH_QUEUE], 1.0)
        .await
        .map_err(|e| WorkerError::Redis(e.to_string()))?;

    if let Some((queue, job_json)) = result {
        match queue.as_str() {
            q if q == queues::RESPOND_QUEUE => {
                process_respond_job(state, serde_json::from_str(&job_json)?).await?;
            }
            q if q == queues::BATCH_QUEUE => {
                process_batch_job(state, serde_json::from_str(&job_json)?).await?;
            }
            _ => tracing::warn!(queue, "unknown queue"),
        }
    }
    Ok(())
}

async fn process_respond_job(state: &WorkerState, job: RespondJob) -> Result<()> {
    tracing::info!(job_id = %job.job_id, "processing respond job");
    let mut c = conn(state).await?;

    set_status(&mut c, state, job.job_id, &JobResult::processing(job.job_id)).await?;

    let cancel = CancellationToken::new();
    match state.responder.respond(&job.request, &cancel).await {
        Ok(answer) => {
            let delivery = deliver(state, &job.request, &answer).await;
            set_status(
                &mut c,
                state,
                job.job_id,
                &JobResult::completed(
                    job.job_id,
                    serde_json::json!({
                        "response": answer.text,
                        "sources": answer.source_chunks.len(),
                        "delivery": delivery,
                    }),
                ),
            )
            .await?;
        }
        Err(e) => {
            set_status(
                &mut c,
                state,
                job.job_id,
                &JobResult::failed(job.job_id, e.to_string()),
            )
            .await?;
        }
    }

    tracing::info!(job_id = %job.job_id, "respond job completed");
    Ok(())
}

async fn process_batch_job(state: &WorkerState, job: BatchRespondJob) -> Result<()> {
    tracing::info!(job_id = %job.job_id, count = job.requests.len(), "processing batch job");
    let mut c = conn(state).await?;

    set_status(&mut c, state, job.job_id, &JobResult::processing(job.job_id)).await?;

    let cancel = CancellationToken::new();
    let items = state.responder.respond_batch(&job.requests, &cancel).await;

    let mut results = Vec::with_capacity(items.len());
    for item in items {
        let entry = match item.outcome {
            Ok(answer) => {
                let delivery = deliver(state, &item.request, &answer).await;
                serde_json::json!({
                    "query": item.request.query,
                    "status": "ok",
                    "response": answer.text,
                    "delivery": delivery,
                })
            }
            Err(e) => serde_json::json!({
                "query": item.request.query,
                "status": "error",
                "error": e.to_string(),
            }),
        };
        results.push(entry);
    }

    set_status(
        &mut c,
        state,
        job.job_id,
        &JobResult::completed(job.job_id, serde_json::json!({ "results": results })),
    )
    .await?;

    tracing::info!(job_id = %job.job_id, "batch job completed");
    Ok(())
}

/// Delivery failures are recorded, not escalated: the generated text has
/// already been computed and is kept in the job result either way.
async fn deliver(
    state: &WorkerState,
    request: &rag_responder::domain::RespondRequest,
    answer: &rag_responder::domain::GeneratedAnswer,
) -> serde_json::Value {
    if request.recipient.is_none() {
        return serde_json::Value::Null;
    }

    let Some(mailer) = &state.mailer else {
        return serde_json::json!({ "channel": "email", "error": "no mail relay configured" });
    };

    match mailer.deliver(request, answer).await {
        Ok(receipt) => serde_json::json!({
            "channel": receipt.channel,
            "detail": receipt.detail,
        }),
        Err(e) => {
            tracing::error!(error = %e, "email delivery failed");
            serde_json::json!({ "channel": "email", "error": e.to_string() })
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let redis_pool = create_pool(&config.redis_url)?;
    info!("Redis connected");

    let concurrency = config.worker.concurrency;
    let state = WorkerState::new(redis_pool, &config).await?;
    info!("Qdrant connected");

    let consumer = JobConsumer::new(state, concurrency);

    info!(concurrency, "worker started");
    consumer.start().await?;

    Ok(())
}
