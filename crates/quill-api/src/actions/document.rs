use tracing::debug;
use uuid::Uuid;

use quill_types::models::{Document, Suggestion};
use quill_types::state::ActionState;

use crate::auth::AuthUser;
use crate::error::{ActionError, settle};
use crate::form::{DocumentInput, DocumentRollback, FormData, SuggestionInput};
use crate::state::{AppState, run_blocking};

/// Stores a new version of a document, creating the document on first save.
pub async fn save_document(
    state: &AppState,
    user: &AuthUser,
    _prev: ActionState,
    form: &FormData,
) -> ActionState {
    settle("save_document", store_version(state, user, form).await)
}

async fn store_version(state: &AppState, user: &AuthUser, form: &FormData) -> Result<(), ActionError> {
    let input = DocumentInput::parse(form)?;
    let owner = user.id;
    run_blocking(state, move |db| {
        if let Some(latest) = db.get_document_by_id(input.id)? {
            if latest.user_id != owner {
                return Err(ActionError::NotFound);
            }
        }

        db.save_document(&Document {
            id: input.id,
            created_at: quill_db::now(),
            user_id: owner,
            title: input.title,
            kind: input.kind,
            content: input.content,
        })?;
        Ok::<_, ActionError>(())
    })
    .await
}

pub async fn delete_document_versions_after(
    state: &AppState,
    user: &AuthUser,
    _prev: ActionState,
    form: &FormData,
) -> ActionState {
    settle("delete_document_versions_after", roll_back(state, user, form).await)
}

async fn roll_back(state: &AppState, user: &AuthUser, form: &FormData) -> Result<(), ActionError> {
    let input = DocumentRollback::parse(form)?;
    let owner = user.id;
    run_blocking(state, move |db| {
        owned_latest(db, input.id, owner)?;
        let removed = db.delete_documents_by_id_after_timestamp(input.id, input.after)?;
        debug!("Rolled back {} versions of document {}", removed.len(), input.id);
        Ok::<_, ActionError>(())
    })
    .await
}

/// Attaches an edit suggestion to the latest version of a document.
pub async fn create_suggestion(
    state: &AppState,
    user: &AuthUser,
    _prev: ActionState,
    form: &FormData,
) -> ActionState {
    settle("create_suggestion", suggest(state, user, form).await)
}

async fn suggest(state: &AppState, user: &AuthUser, form: &FormData) -> Result<(), ActionError> {
    let input = SuggestionInput::parse(form)?;
    let owner = user.id;
    run_blocking(state, move |db| {
        let document = owned_latest(db, input.document_id, owner)?;
        db.save_suggestions(&[Suggestion {
            id: Uuid::new_v4(),
            document_id: document.id,
            document_created_at: document.created_at,
            user_id: owner,
            original_text: input.original_text,
            suggested_text: input.suggested_text,
            description: input.description,
            is_resolved: false,
            created_at: quill_db::now(),
        }])?;
        Ok::<_, ActionError>(())
    })
    .await
}

fn owned_latest(db: &quill_db::Database, id: Uuid, owner: Uuid) -> Result<Document, ActionError> {
    db.get_document_by_id(id)?
        .filter(|document| document.user_id == owner)
        .ok_or(ActionError::NotFound)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use quill_db::format_timestamp;
    use quill_types::models::DocumentKind;

    use super::*;
    use crate::actions::testing;

    fn doc_form(id: Uuid, content: &str) -> FormData {
        FormData::new()
            .with("id", id.to_string())
            .with("title", "Notes")
            .with("kind", "code")
            .with("content", content)
    }

    async fn save(state: &AppState, user: &AuthUser, id: Uuid, content: &str) {
        let result = save_document(state, user, ActionState::Idle, &doc_form(id, content)).await;
        assert_eq!(result, ActionState::Success);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    #[tokio::test]
    async fn saves_accumulate_versions() {
        let state = testing::state();
        let user = testing::user(&state, "a@b.com");
        let id = Uuid::new_v4();

        save(&state, &user, id, "").await;
        save(&state, &user, id, "fn main() {}").await;

        let versions = state.db.get_documents_by_id(id).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].content, "");
        assert_eq!(versions[1].kind, DocumentKind::Code);
        assert_eq!(state.db.get_document_by_id(id).unwrap().unwrap().content, "fn main() {}");
    }

    #[tokio::test]
    async fn strangers_cannot_write_or_roll_back() {
        let state = testing::state();
        let owner = testing::user(&state, "owner@b.com");
        let stranger = testing::user(&state, "stranger@b.com");
        let id = Uuid::new_v4();
        save(&state, &owner, id, "mine").await;

        let result = save_document(&state, &stranger, ActionState::Idle, &doc_form(id, "theirs")).await;
        assert_eq!(result, ActionState::NotFound);

        let rollback = FormData::new()
            .with("id", id.to_string())
            .with("timestamp", "2000-01-01T00:00:00Z");
        let result = delete_document_versions_after(&state, &stranger, ActionState::Idle, &rollback).await;
        assert_eq!(result, ActionState::NotFound);

        assert_eq!(state.db.get_documents_by_id(id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn strangers_cannot_suggest_on_a_document() {
        let state = testing::state();
        let owner = testing::user(&state, "owner@b.com");
        let stranger = testing::user(&state, "stranger@b.com");
        let id = Uuid::new_v4();
        save(&state, &owner, id, "mine").await;

        let form = FormData::new()
            .with("document_id", id.to_string())
            .with("original_text", "mine")
            .with("suggested_text", "theirs");
        assert_eq!(
            create_suggestion(&state, &stranger, ActionState::Idle, &form).await,
            ActionState::NotFound
        );

        assert!(state.db.get_suggestions_by_document_id(id).unwrap().is_empty());
        assert_eq!(state.db.get_documents_by_id(id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rollback_keeps_versions_up_to_the_timestamp() {
        let state = testing::state();
        let user = testing::user(&state, "a@b.com");
        let id = Uuid::new_v4();
        for content in ["one", "two", "three"] {
            save(&state, &user, id, content).await;
        }
        let first = state.db.get_documents_by_id(id).unwrap()[0].created_at;

        let suggestion = FormData::new()
            .with("document_id", id.to_string())
            .with("original_text", "three")
            .with("suggested_text", "3");
        assert_eq!(
            create_suggestion(&state, &user, ActionState::Idle, &suggestion).await,
            ActionState::Success
        );

        let rollback = FormData::new()
            .with("id", id.to_string())
            .with("timestamp", format_timestamp(first));
        let result = delete_document_versions_after(&state, &user, ActionState::Idle, &rollback).await;

        assert_eq!(result, ActionState::Success);
        let left = state.db.get_documents_by_id(id).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].content, "one");
        assert!(state.db.get_suggestions_by_document_id(id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn suggestion_targets_latest_version() {
        let state = testing::state();
        let user = testing::user(&state, "a@b.com");
        let id = Uuid::new_v4();
        save(&state, &user, id, "draft").await;
        save(&state, &user, id, "final").await;

        let form = FormData::new()
            .with("document_id", id.to_string())
            .with("original_text", "final")
            .with("suggested_text", "Final")
            .with("description", "capitalize");
        let result = create_suggestion(&state, &user, ActionState::Idle, &form).await;
        assert_eq!(result, ActionState::Success);

        let latest = state.db.get_document_by_id(id).unwrap().unwrap();
        let suggestions = state.db.get_suggestions_by_document_id(id).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].document_created_at, latest.created_at);
        assert_eq!(suggestions[0].description.as_deref(), Some("capitalize"));
        assert!(!suggestions[0].is_resolved);
    }

    #[tokio::test]
    async fn suggestion_for_missing_document_or_blank_text() {
        let state = testing::state();
        let user = testing::user(&state, "a@b.com");

        let form = FormData::new()
            .with("document_id", Uuid::new_v4().to_string())
            .with("original_text", "a")
            .with("suggested_text", "b");
        assert_eq!(
            create_suggestion(&state, &user, ActionState::Idle, &form).await,
            ActionState::NotFound
        );

        let form = form.with("suggested_text", "  ");
        assert_eq!(
            create_suggestion(&state, &user, ActionState::Idle, &form).await,
            ActionState::InvalidData
        );
    }
}
