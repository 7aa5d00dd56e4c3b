use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{timestamp_at, uuid_at};
use crate::models::UserRow;
use crate::{Database, StoreResult, format_timestamp, now};

impl Database {
    /// Inserts a user. A second insert with the same email fails with
    /// `StoreError::Conflict` and leaves the first row untouched.
    pub fn create_user(&self, id: Uuid, email: &str, password_hash: &str) -> StoreResult<UserRow> {
        let created_at = now();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id.to_string(), email, password_hash, format_timestamp(created_at)),
            )?;
            Ok(UserRow {
                id,
                email: email.to_string(),
                password: password_hash.to_string(),
                created_at,
            })
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                "SELECT id, email, password, created_at FROM users WHERE email = ?1",
                email,
            )
        })
    }

    pub fn get_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRow>> {
        self.with_conn(|conn| {
            query_user(
                conn,
                "SELECT id, email, password, created_at FROM users WHERE id = ?1",
                &id.to_string(),
            )
        })
    }
}

fn query_user(conn: &Connection, sql: &str, key: &str) -> StoreResult<Option<UserRow>> {
    let row = conn.query_row(sql, [key], user_from_row).optional()?;

    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: uuid_at(row, 0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        created_at: timestamp_at(row, 3)?,
    })
}
