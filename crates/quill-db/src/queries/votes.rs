use uuid::Uuid;

use quill_types::models::{Vote, VotePolarity};

use super::uuid_at;
use crate::{Database, StoreResult};

impl Database {
    /// Records a vote, replacing any earlier vote on the same message.
    pub fn vote_message(
        &self,
        chat_id: Uuid,
        message_id: Uuid,
        polarity: VotePolarity,
    ) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO votes (chat_id, message_id, is_upvoted) VALUES (?1, ?2, ?3)
                 ON CONFLICT (chat_id, message_id) DO UPDATE SET is_upvoted = excluded.is_upvoted",
                (chat_id.to_string(), message_id.to_string(), polarity.is_upvote()),
            )?;
            Ok(())
        })
    }

    pub fn get_votes_by_chat_id(&self, chat_id: Uuid) -> StoreResult<Vec<Vote>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT chat_id, message_id, is_upvoted FROM votes WHERE chat_id = ?1",
            )?;

            let rows = stmt
                .query_map([chat_id.to_string()], |row| {
                    Ok(Vote {
                        chat_id: uuid_at(row, 0)?,
                        message_id: uuid_at(row, 1)?,
                        polarity: VotePolarity::from_upvoted(row.get(2)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use quill_types::models::VotePolarity;

    use crate::queries::fixtures;
    use crate::Database;

    #[test]
    fn revoting_flips_polarity_in_place() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner@quill.dev");
        let (chat, first) = fixtures::chat(&db, owner);

        db.vote_message(chat.id, first.id, VotePolarity::Up).unwrap();
        db.vote_message(chat.id, first.id, VotePolarity::Down).unwrap();

        let votes = db.get_votes_by_chat_id(chat.id).unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].polarity, VotePolarity::Down);
    }

    #[test]
    fn vote_on_missing_message_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner@quill.dev");
        let (chat, _) = fixtures::chat(&db, owner);

        let err = db
            .vote_message(chat.id, Uuid::new_v4(), VotePolarity::Up)
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
