//! Server-side actions invoked from form submissions.
//!
//! Each action takes the previous result state and the submitted form,
//! validates the form before touching the store, performs at most one write
//! and answers with a state from a closed set. Nothing is thrown past an
//! action: failures come back as states.

mod auth;
mod chat;
mod document;

pub use auth::{login, register};
pub use chat::{
    delete_chat, delete_trailing_messages, derive_title, send_message, update_chat_visibility,
    vote_message,
};
pub use document::{create_suggestion, delete_document_versions_after, save_document};

#[cfg(test)]
pub(crate) mod testing {
    use quill_db::Database;

    use crate::auth::{AuthUser, Authenticator};
    use crate::state::{AppState, AppStateInner, Limits};

    pub fn state() -> AppState {
        state_with_limits(Limits::default())
    }

    pub fn state_with_limits(limits: Limits) -> AppState {
        AppStateInner::new(
            Database::open_in_memory().unwrap(),
            Authenticator::new("action-tests-signing-secret-0123456789", 1),
            limits,
        )
    }

    pub fn user(state: &AppState, email: &str) -> AuthUser {
        let session = state
            .auth
            .register(&state.db, email, "password123")
            .unwrap();
        AuthUser {
            id: session.user_id(),
            email: email.to_string(),
        }
    }
}
