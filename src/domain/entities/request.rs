use serde::{Deserialize, Serialize};

/// The boundary shape shared by every delivery channel: who to reach,
/// what the exchange is about, and the question to answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondRequest {
    pub recipient: Option<String>,
    pub subject: Option<String>,
    pub query: String,
}

impl RespondRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            recipient: None,
            subject: None,
            query: query.into(),
        }
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}
