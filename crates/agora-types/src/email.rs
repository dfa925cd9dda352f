use serde::{Deserialize, Serialize};

/// A queued email. Serialized as `{"ToEmail", "Subject", "Body"}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailJob {
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

impl EmailJob {
    pub fn new(to_email: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to_email: to_email.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}
