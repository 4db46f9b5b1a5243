use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::tender::TenderId;
use crate::domain::user::{UserId, UserProfile};

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessageId(pub String);

/// One line of per-tender chat. Append-only; messages are never edited or
/// deleted once written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Assigned by the document store on create; empty until then.
    #[serde(default)]
    pub id: ChatMessageId,
    pub tender_id: TenderId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn compose(
        tender_id: TenderId,
        sender: &UserProfile,
        text: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ChatMessageId::default(),
            tender_id,
            sender_id: sender.id.clone(),
            sender_name: sender.name.clone(),
            text: text.into(),
            sent_at: now,
        }
    }
}
