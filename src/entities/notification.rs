use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CONNECTED_MESSAGE: &str = "Connected to notification stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    PostLike,
    Comment,
    CommentReply,
    CommentLike,
    Follow,
    NewPost,
}

/// Durable record of one event directed at a recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub recipient: String,
    pub sender: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNotification {
    pub recipient: String,
    pub sender: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(default)]
    pub post: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Notification {
    pub fn from_new(new: NewNotification) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            recipient: new.recipient,
            sender: new.sender,
            kind: new.kind,
            post: new.post,
            comment: new.comment,
            read: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark_read(&mut self) {
        if !self.read {
            self.read = true;
            self.updated_at = Utc::now();
        }
    }
}

/// Frames pushed from server to client over the live channel.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage<'a, T: Serialize> {
    Connected { message: &'a str },
    Notification { data: &'a T },
}

impl ServerMessage<'static, ()> {
    pub fn connected() -> Self {
        ServerMessage::Connected {
            message: CONNECTED_MESSAGE,
        }
    }
}
