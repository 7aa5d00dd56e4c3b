use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Chat, Message};

// -- Session claims --

/// Claims carried by the session token. Only quill-api reads them; handlers
/// see an `AuthUser` built from these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Loaders --

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: u32,
    pub starting_after: Option<Uuid>,
    pub ending_before: Option<Uuid>,
}

fn default_history_limit() -> u32 {
    20
}

#[derive(Debug, Serialize)]
pub struct ChatHistory {
    pub chats: Vec<Chat>,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatView {
    pub chat: Chat,
    pub messages: Vec<Message>,
    pub is_owner: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatIdQuery {
    pub chat_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct DocumentIdQuery {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    pub document_id: Uuid,
}
