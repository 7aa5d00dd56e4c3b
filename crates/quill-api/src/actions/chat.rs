use chrono::Duration;
use tracing::debug;

use quill_types::models::{Chat, Message, Role};
use quill_types::state::ActionState;

use crate::auth::AuthUser;
use crate::error::{ActionError, settle};
use crate::form::{ChatRef, FormData, MessageRef, OutgoingMessage, VisibilityChange, VoteInput};
use crate::state::{AppState, run_blocking};

const MAX_TITLE_CHARS: usize = 80;

pub async fn update_chat_visibility(
    state: &AppState,
    user: &AuthUser,
    _prev: ActionState,
    form: &FormData,
) -> ActionState {
    settle("update_chat_visibility", change_visibility(state, user, form).await)
}

async fn change_visibility(state: &AppState, user: &AuthUser, form: &FormData) -> Result<(), ActionError> {
    let input = VisibilityChange::parse(form)?;
    let owner = user.id;
    run_blocking(state, move |db| {
        db.update_chat_visibility_by_id(input.chat_id, owner, input.visibility)
    })
    .await
}

/// Deletes a chat together with its messages and votes.
pub async fn delete_chat(
    state: &AppState,
    user: &AuthUser,
    _prev: ActionState,
    form: &FormData,
) -> ActionState {
    settle("delete_chat", remove_chat(state, user, form).await)
}

async fn remove_chat(state: &AppState, user: &AuthUser, form: &FormData) -> Result<(), ActionError> {
    let input = ChatRef::parse(form)?;
    let owner = user.id;
    let chat = run_blocking(state, move |db| db.delete_chat_by_id(input.chat_id, owner)).await?;
    debug!("Chat {} deleted by {}", chat.id, owner);
    Ok(())
}

/// Rewinds a chat: the given message and everything after it are removed.
pub async fn delete_trailing_messages(
    state: &AppState,
    user: &AuthUser,
    _prev: ActionState,
    form: &FormData,
) -> ActionState {
    settle("delete_trailing_messages", rewind_chat(state, user, form).await)
}

async fn rewind_chat(state: &AppState, user: &AuthUser, form: &FormData) -> Result<(), ActionError> {
    let input = MessageRef::parse(form)?;
    let owner = user.id;
    run_blocking(state, move |db| {
        let message = db
            .get_message_by_id(input.message_id)?
            .ok_or(ActionError::NotFound)?;
        let chat = db
            .get_chat_by_id(message.chat_id)?
            .filter(|chat| chat.user_id == owner)
            .ok_or(ActionError::NotFound)?;

        let removed = db.delete_messages_by_chat_id_after_timestamp(chat.id, message.created_at)?;
        debug!("Removed {} trailing messages from chat {}", removed, chat.id);
        Ok::<_, ActionError>(())
    })
    .await
}

/// Appends a user message, starting the chat if it does not exist yet.
pub async fn send_message(
    state: &AppState,
    user: &AuthUser,
    _prev: ActionState,
    form: &FormData,
) -> ActionState {
    settle("send_message", append_message(state, user, form).await)
}

async fn append_message(state: &AppState, user: &AuthUser, form: &FormData) -> Result<(), ActionError> {
    let input = OutgoingMessage::parse(form)?;
    let owner = user.id;
    let limit = state.limits.max_messages_per_day;

    run_blocking(state, move |db| {
        let since = quill_db::now() - Duration::hours(24);
        if db.get_message_count_by_user_id(owner, since)? >= limit {
            return Err(ActionError::RateLimited);
        }

        let message = Message {
            id: input.message_id,
            chat_id: input.chat_id,
            role: Role::User,
            content: input.content,
            created_at: quill_db::now(),
        };

        match db.get_chat_by_id(input.chat_id)? {
            Some(chat) if chat.user_id == owner => db.save_messages(&[message])?,
            Some(_) => return Err(ActionError::NotFound),
            None => {
                let chat = Chat {
                    id: input.chat_id,
                    user_id: owner,
                    title: derive_title(&message.content),
                    visibility: input.visibility,
                    created_at: message.created_at,
                };
                db.create_chat_with_message(&chat, &message)?;
                debug!("Started chat {} for {}", chat.id, owner);
            }
        }
        Ok::<_, ActionError>(())
    })
    .await
}

pub async fn vote_message(
    state: &AppState,
    user: &AuthUser,
    _prev: ActionState,
    form: &FormData,
) -> ActionState {
    settle("vote_message", cast_vote(state, user, form).await)
}

async fn cast_vote(state: &AppState, user: &AuthUser, form: &FormData) -> Result<(), ActionError> {
    let input = VoteInput::parse(form)?;
    let owner = user.id;
    run_blocking(state, move |db| {
        db.get_chat_by_id(input.chat_id)?
            .filter(|chat| chat.user_id == owner)
            .ok_or(ActionError::NotFound)?;
        db.get_message_by_id(input.message_id)?
            .filter(|message| message.chat_id == input.chat_id)
            .ok_or(ActionError::NotFound)?;

        db.vote_message(input.chat_id, input.message_id, input.polarity)?;
        Ok::<_, ActionError>(())
    })
    .await
}

/// Chat title from the opening message: its first non-blank line with runs
/// of whitespace collapsed, cut to 80 characters.
pub fn derive_title(content: &str) -> String {
    let line = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= MAX_TITLE_CHARS {
        return collapsed;
    }
    let mut title: String = collapsed.chars().take(MAX_TITLE_CHARS - 1).collect();
    title.push('…');
    title
}
