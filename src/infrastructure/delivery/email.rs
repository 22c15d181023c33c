use async_trait::async_trait;

use crate::domain::{
    ports::DeliveryChannel, DeliveryReceipt, GeneratedAnswer, PipelineError, RespondRequest,
};
use crate::infrastructure::config::MailConfig;

/// Sends the generated text through an HTTP mail relay. Message encoding
/// past `{from, to, subject, text}` belongs to the relay, not this service.
pub struct EmailDelivery {
    http: reqwest::Client,
    relay_url: String,
    from: String,
}

impl EmailDelivery {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            relay_url: config.relay_url.clone(),
            from: config.from.clone(),
        }
    }
}

#[async_trait]
impl DeliveryChannel for EmailDelivery {
    fn channel(&self) -> &'static str {
        "email"
    }

    async fn deliver(
        &self,
        request: &RespondRequest,
        answer: &GeneratedAnswer,
    ) -> Result<DeliveryReceipt, PipelineError> {
        let to = request
            .recipient
            .as_deref()
            .ok_or_else(|| PipelineError::delivery("email delivery requires a recipient"))?;

        let response = self
            .http
            .post(&self.relay_url)
            .json(&serde_json::json!({
                "from": self.from,
                "to": to,
                "subject": request.subject.as_deref().unwrap_or("Re: your question"),
                "text": answer.text,
            }))
            .send()
            .await
            .map_err(|e| PipelineError::delivery(format!("mail relay unreachable: {e}")))?;

        if !response.status().is_success() {
            return Err(PipelineError::delivery(format!(
                "mail relay returned {}",
                response.status()
            )));
        }

        let message_id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("id").and_then(|v| v.as_str()).map(String::from))
            .unwrap_or_else(|| format!("sent to {to}"));

        Ok(DeliveryReceipt::new("email", message_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_recipient_fails_without_touching_answer() {
        let delivery = EmailDelivery::new(&MailConfig {
            relay_url: "http://localhost:0/send".into(),
            from: "hr@example.com".into(),
        });
        let answer = GeneratedAnswer::new("generated text", Vec::new());

        let result = delivery
            .deliver(&RespondRequest::new("question"), &answer)
            .await;

        assert!(matches!(result, Err(PipelineError::Delivery(_))));
        assert_eq!(answer.text, "generated text");
    }
}
