use std::sync::Arc;

use crate::api::queue::{JobProducer, RedisPool};
use crate::application::{KnowledgeIndex, Responder};
use crate::infrastructure::{AppConfig, EmailDelivery};

/// The explicitly constructed dependency bundle handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub redis_pool: RedisPool,
    pub job_producer: JobProducer,
    pub responder: Arc<Responder>,
    pub index: Arc<KnowledgeIndex>,
    pub mailer: Option<Arc<EmailDelivery>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        redis_pool: RedisPool,
        responder: Arc<Responder>,
        index: Arc<KnowledgeIndex>,
        config: AppConfig,
    ) -> Self {
        let config = Arc::new(config);
        let job_producer = JobProducer::new(redis_pool.clone(), config.worker.result_ttl);
        let mailer = config
            .mail
            .as_ref()
            .map(|mail| Arc::new(EmailDelivery::new(mail)));

        Self {
            redis_pool,
            job_producer,
            responder,
            index,
            mailer,
            config,
        }
    }
}
