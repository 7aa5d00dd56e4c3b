use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use quill_types::models::{Message, Role};

use super::{parsed_at, timestamp_at, uuid_at};
use crate::{Database, StoreResult, format_timestamp};

impl Database {
    /// Appends messages to existing chats in one transaction.
    pub fn save_messages(&self, messages: &[Message]) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for message in messages {
                insert_message(&tx, message)?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Messages of a chat, oldest first.
    pub fn get_messages_by_chat_id(&self, chat_id: Uuid) -> StoreResult<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, chat_id, role, content, created_at
                 FROM messages
                 WHERE chat_id = ?1
                 ORDER BY created_at ASC",
            )?;

            let rows = stmt
                .query_map([chat_id.to_string()], message_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn get_message_by_id(&self, id: Uuid) -> StoreResult<Option<Message>> {
        self.with_conn(|conn| {
            let message = conn
                .query_row(
                    "SELECT id, chat_id, role, content, created_at FROM messages WHERE id = ?1",
                    [id.to_string()],
                    message_from_row,
                )
                .optional()?;
            Ok(message)
        })
    }

    /// Removes every message of the chat created at or after `from`, along
    /// with the votes on them. Returns how many messages went.
    pub fn delete_messages_by_chat_id_after_timestamp(
        &self,
        chat_id: Uuid,
        from: DateTime<Utc>,
    ) -> StoreResult<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let cid = chat_id.to_string();
            let from = format_timestamp(from);

            tx.execute(
                "DELETE FROM votes
                 WHERE chat_id = ?1
                   AND message_id IN (
                       SELECT id FROM messages WHERE chat_id = ?1 AND created_at >= ?2
                   )",
                [&cid, &from],
            )?;
            let removed = tx.execute(
                "DELETE FROM messages WHERE chat_id = ?1 AND created_at >= ?2",
                [&cid, &from],
            )?;
            tx.commit()?;

            Ok(removed)
        })
    }

    /// Counts user-authored messages across all of a user's chats since `since`.
    pub fn get_message_count_by_user_id(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> StoreResult<u32> {
        self.with_conn(|conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(*)
                 FROM messages m
                 JOIN chats c ON m.chat_id = c.id
                 WHERE c.user_id = ?1 AND m.role = ?2 AND m.created_at >= ?3",
                (user_id.to_string(), Role::User.as_str(), format_timestamp(since)),
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }
}

pub(super) fn insert_message(conn: &Connection, message: &Message) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO messages (id, chat_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            message.id.to_string(),
            message.chat_id.to_string(),
            message.role.as_str(),
            &message.content,
            format_timestamp(message.created_at),
        ),
    )?;
    Ok(())
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: uuid_at(row, 0)?,
        chat_id: uuid_at(row, 1)?,
        role: parsed_at(row, 2)?,
        content: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use quill_types::models::{Role, VotePolarity};

    use crate::queries::fixtures;
    use crate::{Database, now};

    #[test]
    fn messages_come_back_in_order() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner@quill.dev");
        let (chat, first) = fixtures::chat(&db, owner);

        let reply = fixtures::message_in(chat.id, Role::Assistant, first.created_at + Duration::seconds(1));
        let follow = fixtures::message_in(chat.id, Role::User, first.created_at + Duration::seconds(2));
        db.save_messages(&[follow.clone(), reply.clone()]).unwrap();

        let ids: Vec<_> = db
            .get_messages_by_chat_id(chat.id)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![first.id, reply.id, follow.id]);

        let read = db.get_message_by_id(reply.id).unwrap().unwrap();
        assert_eq!(read.role, Role::Assistant);
        assert_eq!(read.content, reply.content);
    }

    #[test]
    fn saving_into_a_missing_chat_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner@quill.dev");
        let (chat, _) = fixtures::chat(&db, owner);

        let good = fixtures::message_in(chat.id, Role::User, now());
        let orphan = fixtures::message_in(Uuid::new_v4(), Role::User, now());

        let err = db.save_messages(&[good.clone(), orphan]).unwrap_err();
        assert!(err.is_not_found());
        assert!(db.get_message_by_id(good.id).unwrap().is_none());
    }

    #[test]
    fn trailing_delete_is_inclusive_and_drops_votes() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner@quill.dev");
        let (chat, first) = fixtures::chat(&db, owner);

        let second = fixtures::message_in(chat.id, Role::Assistant, first.created_at + Duration::seconds(1));
        let third = fixtures::message_in(chat.id, Role::User, first.created_at + Duration::seconds(2));
        db.save_messages(&[second.clone(), third.clone()]).unwrap();
        db.vote_message(chat.id, first.id, VotePolarity::Up).unwrap();
        db.vote_message(chat.id, second.id, VotePolarity::Down).unwrap();

        let removed = db
            .delete_messages_by_chat_id_after_timestamp(chat.id, second.created_at)
            .unwrap();
        assert_eq!(removed, 2);

        let left = db.get_messages_by_chat_id(chat.id).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, first.id);

        let votes = db.get_votes_by_chat_id(chat.id).unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].message_id, first.id);
    }

    #[test]
    fn message_count_only_counts_recent_user_messages() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner@quill.dev");
        let (chat, first) = fixtures::chat(&db, owner);

        let old = fixtures::message_in(chat.id, Role::User, first.created_at - Duration::hours(30));
        let reply = fixtures::message_in(chat.id, Role::Assistant, first.created_at);
        db.save_messages(&[old, reply]).unwrap();

        let since = now() - Duration::hours(24);
        assert_eq!(db.get_message_count_by_user_id(owner, since).unwrap(), 1);
    }
}
