use rusqlite::{OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use quill_types::models::{Chat, Message, Visibility};

use super::messages::insert_message;
use super::{parsed_at, timestamp_at, uuid_at};
use crate::models::{ChatPage, PageCursor};
use crate::{Database, StoreError, StoreResult, format_timestamp};

impl Database {
    /// Creates a chat together with its opening message. Both rows land or
    /// neither does.
    pub fn create_chat_with_message(&self, chat: &Chat, first: &Message) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO chats (id, user_id, title, visibility, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (
                    chat.id.to_string(),
                    chat.user_id.to_string(),
                    &chat.title,
                    chat.visibility.as_str(),
                    format_timestamp(chat.created_at),
                ),
            )?;
            insert_message(&tx, first)?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_chat_by_id(&self, id: Uuid) -> StoreResult<Option<Chat>> {
        self.with_conn(|conn| {
            let chat = conn
                .query_row(
                    "SELECT id, user_id, title, visibility, created_at FROM chats WHERE id = ?1",
                    [id.to_string()],
                    chat_from_row,
                )
                .optional()?;
            Ok(chat)
        })
    }

    /// Newest-first page of a user's chats. Fetches one extra row to learn
    /// whether another page exists.
    pub fn get_chats_by_user_id(
        &self,
        user_id: Uuid,
        limit: u32,
        cursor: Option<PageCursor>,
    ) -> StoreResult<ChatPage> {
        self.with_conn(|conn| {
            let anchor = match cursor {
                Some(PageCursor::StartingAfter(id)) | Some(PageCursor::EndingBefore(id)) => {
                    let created_at: Option<String> = conn
                        .query_row(
                            "SELECT created_at FROM chats WHERE id = ?1 AND user_id = ?2",
                            [id.to_string(), user_id.to_string()],
                            |r| r.get(0),
                        )
                        .optional()?;
                    Some(created_at.ok_or(StoreError::InvalidCursor)?)
                }
                None => None,
            };
            let (after, before) = match cursor {
                Some(PageCursor::StartingAfter(_)) => (anchor, None),
                Some(PageCursor::EndingBefore(_)) => (None, anchor),
                None => (None, None),
            };

            let mut stmt = conn.prepare(
                "SELECT id, user_id, title, visibility, created_at
                 FROM chats
                 WHERE user_id = ?1
                   AND (?3 IS NULL OR created_at > ?3)
                   AND (?4 IS NULL OR created_at < ?4)
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
            )?;

            let mut chats = stmt
                .query_map(
                    rusqlite::params![user_id.to_string(), i64::from(limit) + 1, after, before],
                    chat_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;

            let has_more = chats.len() > limit as usize;
            chats.truncate(limit as usize);

            Ok(ChatPage { chats, has_more })
        })
    }

    /// Changes the visibility of a chat owned by `owner`. Chats that do not
    /// exist or belong to someone else are reported as not found.
    pub fn update_chat_visibility_by_id(
        &self,
        id: Uuid,
        owner: Uuid,
        visibility: Visibility,
    ) -> StoreResult<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE chats SET visibility = ?1 WHERE id = ?2 AND user_id = ?3",
                (visibility.as_str(), id.to_string(), owner.to_string()),
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("chat {id}")));
            }
            Ok(())
        })
    }

    /// Deletes a chat with its votes and messages in one transaction and
    /// returns the removed chat.
    pub fn delete_chat_by_id(&self, id: Uuid, owner: Uuid) -> StoreResult<Chat> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let cid = id.to_string();

            let chat = tx
                .query_row(
                    "SELECT id, user_id, title, visibility, created_at
                     FROM chats WHERE id = ?1 AND user_id = ?2",
                    [&cid, &owner.to_string()],
                    chat_from_row,
                )
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("chat {id}")))?;

            let votes = tx.execute("DELETE FROM votes WHERE chat_id = ?1", [&cid])?;
            let messages = tx.execute("DELETE FROM messages WHERE chat_id = ?1", [&cid])?;
            tx.execute("DELETE FROM chats WHERE id = ?1", [&cid])?;
            tx.commit()?;

            debug!("Deleted chat {} ({} messages, {} votes)", id, messages, votes);
            Ok(chat)
        })
    }
}

pub(crate) fn chat_from_row(row: &Row<'_>) -> rusqlite::Result<Chat> {
    Ok(Chat {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        title: row.get(2)?,
        visibility: parsed_at(row, 3)?,
        created_at: timestamp_at(row, 4)?,
    })
}
