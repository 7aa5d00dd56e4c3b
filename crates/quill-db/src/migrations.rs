use rusqlite::Connection;
use tracing::info;

use crate::StoreResult;

pub fn run(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE chats (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title       TEXT NOT NULL,
                visibility  TEXT NOT NULL DEFAULT 'private'
                            CHECK (visibility IN ('public', 'private')),
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_chats_user ON chats(user_id, created_at);

            CREATE TABLE messages (
                id          TEXT PRIMARY KEY,
                chat_id     TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
                role        TEXT NOT NULL CHECK (role IN ('user', 'assistant', 'system')),
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_messages_chat ON messages(chat_id, created_at);

            CREATE TABLE votes (
                chat_id     TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
                message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                is_upvoted  INTEGER NOT NULL,
                PRIMARY KEY (chat_id, message_id)
            );

            CREATE TABLE documents (
                id          TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title       TEXT NOT NULL,
                kind        TEXT NOT NULL DEFAULT 'text'
                            CHECK (kind IN ('text', 'code', 'image', 'sheet')),
                content     TEXT NOT NULL,
                PRIMARY KEY (id, created_at)
            );

            CREATE TABLE suggestions (
                id                   TEXT PRIMARY KEY,
                document_id          TEXT NOT NULL,
                document_created_at  TEXT NOT NULL,
                user_id              TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                original_text        TEXT NOT NULL,
                suggested_text       TEXT NOT NULL,
                description          TEXT,
                is_resolved          INTEGER NOT NULL DEFAULT 0,
                created_at           TEXT NOT NULL,
                FOREIGN KEY (document_id, document_created_at)
                    REFERENCES documents(id, created_at) ON DELETE CASCADE
            );

            CREATE INDEX idx_suggestions_document ON suggestions(document_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
