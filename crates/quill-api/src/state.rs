use std::sync::Arc;

use tracing::error;

use quill_db::Database;

use crate::auth::Authenticator;
use crate::error::ActionError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub auth: Authenticator,
    pub limits: Limits,
}

#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// User-authored messages allowed per rolling 24 hours.
    pub max_messages_per_day: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_messages_per_day: 100,
        }
    }
}

impl AppStateInner {
    pub fn new(db: Database, auth: Authenticator, limits: Limits) -> AppState {
        Arc::new(Self {
            db: Arc::new(db),
            auth,
            limits,
        })
    }
}

/// Runs blocking store (and Argon2) work off the async runtime.
pub(crate) async fn run_blocking<F, T, E>(state: &AppState, f: F) -> Result<T, ActionError>
where
    F: FnOnce(&Database) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ActionError> + Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ActionError::Internal(e.to_string())
        })?
        .map_err(Into::into)
}
