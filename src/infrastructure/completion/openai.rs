use std::time::Duration;

use async_trait::async_trait;
use rig::client::{CompletionClient as RigCompletionClient, ProviderClient};
use rig::completion::Prompt;
use rig::providers::openai;

use crate::domain::{ports::CompletionClient, PipelineError};
use crate::infrastructure::config::LlmConfig;

/// OpenAI chat-completion client. One call, full response string, bounded
/// by a wall-clock timeout; no retries.
pub struct OpenAiCompletion {
    client: openai::Client,
    model: String,
    timeout: Duration,
}

impl OpenAiCompletion {
    pub fn from_env(config: &LlmConfig) -> Self {
        Self {
            client: openai::Client::from_env(),
            model: config.model.clone(),
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        user_query: &str,
    ) -> Result<String, PipelineError> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(system_prompt)
            .build();

        tokio::time::timeout(self.timeout, agent.prompt(user_query))
            .await
            .map_err(|_| PipelineError::completion("completion timed out"))?
            .map_err(|e| PipelineError::completion(e.to_string()))
    }
}
