/// Database row types that have no direct client-facing counterpart.
/// Everything else is read straight into the quill-types models.
use chrono::{DateTime, Utc};
use uuid::Uuid;

use quill_types::models::{Chat, User};

/// A user row including the Argon2 PHC string. Never serialized.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

/// Keyset cursor for chat history, relative to an existing chat's creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCursor {
    /// Chats created after the named chat.
    StartingAfter(Uuid),
    /// Chats created before the named chat.
    EndingBefore(Uuid),
}

pub struct ChatPage {
    pub chats: Vec<Chat>,
    pub has_more: bool,
}
