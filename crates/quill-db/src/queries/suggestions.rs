use rusqlite::Row;
use uuid::Uuid;

use quill_types::models::Suggestion;

use super::{timestamp_at, uuid_at};
use crate::{Database, StoreResult, format_timestamp};

impl Database {
    pub fn save_suggestions(&self, suggestions: &[Suggestion]) -> StoreResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO suggestions (id, document_id, document_created_at, user_id,
                         original_text, suggested_text, description, is_resolved, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )?;
                for s in suggestions {
                    stmt.execute(rusqlite::params![
                        s.id.to_string(),
                        s.document_id.to_string(),
                        format_timestamp(s.document_created_at),
                        s.user_id.to_string(),
                        s.original_text,
                        s.suggested_text,
                        s.description,
                        s.is_resolved,
                        format_timestamp(s.created_at),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Suggestions across every version of a document, oldest first.
    pub fn get_suggestions_by_document_id(&self, document_id: Uuid) -> StoreResult<Vec<Suggestion>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, document_id, document_created_at, user_id, original_text,
                        suggested_text, description, is_resolved, created_at
                 FROM suggestions
                 WHERE document_id = ?1
                 ORDER BY created_at ASC",
            )?;

            let rows = stmt
                .query_map([document_id.to_string()], suggestion_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn suggestion_from_row(row: &Row<'_>) -> rusqlite::Result<Suggestion> {
    Ok(Suggestion {
        id: uuid_at(row, 0)?,
        document_id: uuid_at(row, 1)?,
        document_created_at: timestamp_at(row, 2)?,
        user_id: uuid_at(row, 3)?,
        original_text: row.get(4)?,
        suggested_text: row.get(5)?,
        description: row.get(6)?,
        is_resolved: row.get(7)?,
        created_at: timestamp_at(row, 8)?,
    })
}
