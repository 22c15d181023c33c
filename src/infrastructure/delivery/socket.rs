use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::domain::{
    ports::DeliveryChannel, DeliveryReceipt, GeneratedAnswer, PipelineError, RespondRequest,
};

/// JSON frame pushed to an open bidirectional channel.
#[derive(Debug, Serialize)]
pub struct SocketFrame {
    pub r#type: &'static str,
    pub text: String,
    pub sources: usize,
}

/// Pushes answers into an open WebSocket session. The session task owns the
/// socket and drains this sender; a closed session surfaces as a delivery
/// error while the answer itself stays intact.
pub struct SocketDelivery {
    sender: mpsc::Sender<String>,
}

impl SocketDelivery {
    pub fn new(sender: mpsc::Sender<String>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl DeliveryChannel for SocketDelivery {
    fn channel(&self) -> &'static str {
        "socket"
    }

    async fn deliver(
        &self,
        _request: &RespondRequest,
        answer: &GeneratedAnswer,
    ) -> Result<DeliveryReceipt, PipelineError> {
        let frame = SocketFrame {
            r#type: "answer",
            text: answer.text.clone(),
            sources: answer.source_chunks.len(),
        };
        let json =
            serde_json::to_string(&frame).map_err(|e| PipelineError::internal(e.to_string()))?;

        self.sender
            .send(json)
            .await
            .map_err(|_| PipelineError::delivery("socket session closed"))?;

        Ok(DeliveryReceipt::new("socket", "frame queued"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::KnowledgeChunk;

    #[tokio::test]
    async fn test_answer_is_framed_and_queued() {
        let (tx, mut rx) = mpsc::channel(4);
        let delivery = SocketDelivery::new(tx);

        let answer = GeneratedAnswer::new(
            "Employees accrue 15 PTO days each year.",
            vec![KnowledgeChunk::new("Employees accrue 15 PTO days/year.")],
        );
        let receipt = delivery
            .deliver(&RespondRequest::new("PTO policy?"), &answer)
            .await
            .unwrap();

        assert_eq!(receipt.channel, "socket");

        let frame: serde_json::Value =
            serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["type"], "answer");
        assert_eq!(frame["sources"], 1);
        assert!(frame["text"].as_str().unwrap().contains("15 PTO days"));
    }

    #[tokio::test]
    async fn test_closed_session_is_a_delivery_error() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let delivery = SocketDelivery::new(tx);

        let answer = GeneratedAnswer::new("text", Vec::new());
        let result = delivery
            .deliver(&RespondRequest::new("question"), &answer)
            .await;

        assert!(matches!(result, Err(PipelineError::Delivery(_))));
        assert_eq!(answer.text, "text");
    }
}
