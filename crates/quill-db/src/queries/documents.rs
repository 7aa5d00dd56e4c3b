use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use quill_types::models::Document;

use super::{parsed_at, timestamp_at, uuid_at};
use crate::{Database, StoreResult, format_timestamp};

impl Database {
    /// Stores a new version. Saving the same `(id, created_at)` twice is a conflict.
    pub fn save_document(&self, document: &Document) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (id, created_at, user_id, title, kind, content)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    document.id.to_string(),
                    format_timestamp(document.created_at),
                    document.user_id.to_string(),
                    &document.title,
                    document.kind.as_str(),
                    &document.content,
                ),
            )?;
            Ok(())
        })
    }

    /// Every version of a document, oldest first.
    pub fn get_documents_by_id(&self, id: Uuid) -> StoreResult<Vec<Document>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, created_at, user_id, title, kind, content
                 FROM documents WHERE id = ?1 ORDER BY created_at ASC",
            )?;

            let rows = stmt
                .query_map([id.to_string()], document_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Latest version of a document.
    pub fn get_document_by_id(&self, id: Uuid) -> StoreResult<Option<Document>> {
        self.with_conn(|conn| {
            let document = conn
                .query_row(
                    "SELECT id, created_at, user_id, title, kind, content
                     FROM documents WHERE id = ?1 ORDER BY created_at DESC LIMIT 1",
                    [id.to_string()],
                    document_from_row,
                )
                .optional()?;
            Ok(document)
        })
    }

    /// Drops versions created strictly after `after`, and their suggestions.
    /// Returns the removed versions.
    pub fn delete_documents_by_id_after_timestamp(
        &self,
        id: Uuid,
        after: DateTime<Utc>,
    ) -> StoreResult<Vec<Document>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let did = id.to_string();
            let after = format_timestamp(after);

            let removed = {
                let mut stmt = tx.prepare(
                    "SELECT id, created_at, user_id, title, kind, content
                     FROM documents WHERE id = ?1 AND created_at > ?2 ORDER BY created_at ASC",
                )?;
                let rows = stmt
                    .query_map([&did, &after], document_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            };

            tx.execute(
                "DELETE FROM suggestions WHERE document_id = ?1 AND document_created_at > ?2",
                [&did, &after],
            )?;
            tx.execute(
                "DELETE FROM documents WHERE id = ?1 AND created_at > ?2",
                [&did, &after],
            )?;
            tx.commit()?;

            Ok(removed)
        })
    }
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: uuid_at(row, 0)?,
        created_at: timestamp_at(row, 1)?,
        user_id: uuid_at(row, 2)?,
        title: row.get(3)?,
        kind: parsed_at(row, 4)?,
        content: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use uuid::Uuid;

    use quill_types::models::{Document, DocumentKind};

    use crate::queries::fixtures;
    use crate::{Database, now};

    fn version(id: Uuid, owner: Uuid, offset_secs: i64, content: &str) -> Document {
        Document {
            id,
            created_at: now() + Duration::seconds(offset_secs),
            user_id: owner,
            title: "Notes".to_string(),
            kind: DocumentKind::Code,
            content: content.to_string(),
        }
    }

    #[test]
    fn versions_accumulate_and_latest_wins() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner@quill.dev");
        let id = Uuid::new_v4();

        db.save_document(&version(id, owner, 0, "v1")).unwrap();
        db.save_document(&version(id, owner, 1, "v2")).unwrap();

        let all = db.get_documents_by_id(id).unwrap();
        assert_eq!(all.iter().map(|d| d.content.as_str()).collect::<Vec<_>>(), ["v1", "v2"]);

        let latest = db.get_document_by_id(id).unwrap().unwrap();
        assert_eq!(latest.content, "v2");
        assert_eq!(latest.kind, DocumentKind::Code);
    }

    #[test]
    fn same_version_key_is_a_conflict() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner@quill.dev");
        let doc = version(Uuid::new_v4(), owner, 0, "v1");

        db.save_document(&doc).unwrap();
        assert!(db.save_document(&doc).unwrap_err().is_conflict());
    }

    #[test]
    fn deleting_after_a_version_keeps_it() {
        let db = Database::open_in_memory().unwrap();
        let owner = fixtures::user(&db, "owner@quill.dev");
        let id = Uuid::new_v4();
        let v1 = version(id, owner, 0, "v1");
        let v2 = version(id, owner, 1, "v2");
        let v3 = version(id, owner, 2, "v3");
        for v in [&v1, &v2, &v3] {
            db.save_document(v).unwrap();
        }

        let removed = db.delete_documents_by_id_after_timestamp(id, v1.created_at).unwrap();
        assert_eq!(removed.len(), 2);

        let left = db.get_documents_by_id(id).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].content, "v1");
    }
}
