use async_trait::async_trait;

use crate::domain::errors::PipelineError;

/// Single-call wrapper around a hosted chat-completion endpoint.
///
/// Synchronous from the caller's perspective: the future resolves once the
/// full response string is available. Network or quota errors surface as
/// `PipelineError::Completion`; there are no retries anywhere in the
/// pipeline.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_query: &str)
        -> Result<String, PipelineError>;
}
