use async_trait::async_trait;

use crate::domain::{errors::PipelineError, DeliveryReceipt, GeneratedAnswer, RespondRequest};

/// Hands a generated answer to an external channel.
///
/// Failure is local to the transport: a failed delivery must not corrupt the
/// already-computed answer, and is reported separately from generation
/// failure.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn channel(&self) -> &'static str;

    async fn deliver(
        &self,
        request: &RespondRequest,
        answer: &GeneratedAnswer,
    ) -> Result<DeliveryReceipt, PipelineError>;
}
