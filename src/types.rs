use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Wire form of a message as the relay expects it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    User,
    Assistant,
}

impl From<Origin> for Role {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::User => Role::User,
            Origin::Assistant => Role::Assistant,
        }
    }
}

/// A message shown in the conversation. Immutable once created.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    id: String,
    content: String,
    origin: Origin,
    sent_at: OffsetDateTime,
}

impl Message {
    pub fn new(origin: Origin, content: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), origin, content)
    }

    pub fn with_id(id: impl Into<String>, origin: Origin, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            origin,
            sent_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Origin::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Origin::Assistant, content)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn sent_at(&self) -> OffsetDateTime {
        self.sent_at
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        ChatMessage::new(self.origin.into(), self.content.clone())
    }
}
