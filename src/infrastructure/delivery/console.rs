use std::io::Write;

use async_trait::async_trait;

use crate::domain::{
    ports::DeliveryChannel, DeliveryReceipt, GeneratedAnswer, PipelineError, RespondRequest,
};

/// Renders the answer to the interactive session's stdout. Stand-in for the
/// original UI-render channel.
pub struct ConsoleDelivery;

#[async_trait]
impl DeliveryChannel for ConsoleDelivery {
    fn channel(&self) -> &'static str {
        "console"
    }

    async fn deliver(
        &self,
        request: &RespondRequest,
        answer: &GeneratedAnswer,
    ) -> Result<DeliveryReceipt, PipelineError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "Q: {}", request.query)
            .and_then(|_| writeln!(stdout, "A: {}", answer.text))
            .map_err(|e| PipelineError::delivery(e.to_string()))?;

        Ok(DeliveryReceipt::new("console", "rendered"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_render_produces_receipt() {
        let delivery = ConsoleDelivery;
        let answer = GeneratedAnswer::new("Employees accrue 15 PTO days each year.", Vec::new());

        let receipt = delivery
            .deliver(&RespondRequest::new("What is the PTO policy?"), &answer)
            .await
            .unwrap();

        assert_eq!(receipt.channel, "console");
        assert_eq!(delivery.channel(), "console");
    }
}
