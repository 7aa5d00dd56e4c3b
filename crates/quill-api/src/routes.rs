//! HTTP surface: form actions answering JSON result states, and JSON loaders.

use axum::{
    Extension, Form, Json, Router,
    extract::{
        Path, Query, State,
        rejection::{FormRejection, PathRejection, QueryRejection},
    },
    middleware,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use quill_db::PageCursor;
use quill_types::api::{ChatHistory, ChatIdQuery, ChatView, DocumentIdQuery, HistoryQuery, SuggestionQuery};
use quill_types::models::{Document, Suggestion, Visibility, Vote};
use quill_types::state::{ActionState, LoginActionState, RegisterActionState};

use crate::actions;
use crate::auth::{AuthUser, SessionJar, clear_session};
use crate::error::{ActionError, ApiError};
use crate::form::FormData;
use crate::middleware::gate;
use crate::state::{AppState, run_blocking};

const MAX_HISTORY_LIMIT: u32 = 100;

/// A form body that failed to decode is treated as an empty form, so the
/// action answers `invalid_data` instead of a bare rejection.
type FormBody = Result<Form<FormData>, FormRejection>;

fn form_data(body: FormBody) -> FormData {
    body.map(|Form(form)| form).unwrap_or_default()
}

/// Loader inputs whose rejections are answered as JSON `400`s.
type QueryParams<T> = Result<Query<T>, QueryRejection>;
type PathParam<T> = Result<Path<T>, PathRejection>;

fn query_params<T>(params: QueryParams<T>) -> Result<T, ApiError> {
    params
        .map(|Query(query)| query)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn path_param<T>(param: PathParam<T>) -> Result<T, ApiError> {
    param
        .map(|Path(value)| value)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/", get(history))
        .route("/chat/{id}", get(chat_view))
        .route("/api/history", get(history))
        .route("/api/chat", post(send_message).delete(delete_chat))
        .route("/api/vote", get(votes).post(vote_message))
        .route(
            "/api/document",
            get(document_versions)
                .post(save_document)
                .delete(delete_document_versions_after),
        )
        .route("/api/suggestions", get(suggestions).post(create_suggestion))
        .route("/actions/chat-visibility", post(update_chat_visibility))
        .route("/actions/delete-trailing", post(delete_trailing_messages))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(state.clone(), gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// -- Auth --

async fn login(
    State(state): State<AppState>,
    cookies: CookieJar,
    body: FormBody,
) -> (CookieJar, Json<LoginActionState>) {
    let mut jar = SessionJar::default();
    let result = actions::login(&state, &mut jar, LoginActionState::Idle, &form_data(body)).await;
    (jar.write(cookies), Json(result))
}

async fn register(
    State(state): State<AppState>,
    cookies: CookieJar,
    body: FormBody,
) -> (CookieJar, Json<RegisterActionState>) {
    let mut jar = SessionJar::default();
    let result =
        actions::register(&state, &mut jar, RegisterActionState::Idle, &form_data(body)).await;
    (jar.write(cookies), Json(result))
}

async fn logout(cookies: CookieJar) -> impl IntoResponse {
    (clear_session(cookies), Redirect::to("/login"))
}

async fn health() -> &'static str {
    "ok"
}

// -- Actions --

async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: FormBody,
) -> Json<ActionState> {
    Json(actions::send_message(&state, &user, ActionState::Idle, &form_data(body)).await)
}

async fn delete_chat(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: FormBody,
) -> Json<ActionState> {
    Json(actions::delete_chat(&state, &user, ActionState::Idle, &form_data(body)).await)
}

async fn vote_message(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: FormBody,
) -> Json<ActionState> {
    Json(actions::vote_message(&state, &user, ActionState::Idle, &form_data(body)).await)
}

async fn save_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: FormBody,
) -> Json<ActionState> {
    Json(actions::save_document(&state, &user, ActionState::Idle, &form_data(body)).await)
}

async fn delete_document_versions_after(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: FormBody,
) -> Json<ActionState> {
    let form = form_data(body);
    Json(actions::delete_document_versions_after(&state, &user, ActionState::Idle, &form).await)
}

async fn create_suggestion(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: FormBody,
) -> Json<ActionState> {
    Json(actions::create_suggestion(&state, &user, ActionState::Idle, &form_data(body)).await)
}

async fn update_chat_visibility(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: FormBody,
) -> Json<ActionState> {
    let form = form_data(body);
    Json(actions::update_chat_visibility(&state, &user, ActionState::Idle, &form).await)
}

async fn delete_trailing_messages(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: FormBody,
) -> Json<ActionState> {
    let form = form_data(body);
    Json(actions::delete_trailing_messages(&state, &user, ActionState::Idle, &form).await)
}

// -- Loaders --

async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    params: QueryParams<HistoryQuery>,
) -> Result<Json<ChatHistory>, ApiError> {
    let query = query_params(params)?;
    let cursor = match (query.starting_after, query.ending_before) {
        (Some(_), Some(_)) => {
            return Err(ApiError::BadRequest(
                "only one of starting_after or ending_before may be given".into(),
            ));
        }
        (Some(id), None) => Some(PageCursor::StartingAfter(id)),
        (None, Some(id)) => Some(PageCursor::EndingBefore(id)),
        (None, None) => None,
    };
    let limit = query.limit.clamp(1, MAX_HISTORY_LIMIT);

    let page = run_blocking(&state, move |db| db.get_chats_by_user_id(user.id, limit, cursor)).await?;
    Ok(Json(ChatHistory {
        chats: page.chats,
        has_more: page.has_more,
    }))
}

async fn chat_view(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    id: PathParam<Uuid>,
) -> Result<Json<ChatView>, ApiError> {
    let id = path_param(id)?;
    let view = run_blocking(&state, move |db| {
        let chat = db.get_chat_by_id(id)?.ok_or(ActionError::NotFound)?;
        let is_owner = chat.user_id == user.id;
        if chat.visibility == Visibility::Private && !is_owner {
            return Err(ActionError::NotFound);
        }

        let messages = db.get_messages_by_chat_id(chat.id)?;
        Ok::<_, ActionError>(ChatView {
            chat,
            messages,
            is_owner,
        })
    })
    .await?;

    Ok(Json(view))
}

async fn votes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    params: QueryParams<ChatIdQuery>,
) -> Result<Json<Vec<Vote>>, ApiError> {
    let query = query_params(params)?;
    let votes = run_blocking(&state, move |db| {
        db.get_chat_by_id(query.chat_id)?
            .filter(|chat| chat.user_id == user.id)
            .ok_or(ActionError::NotFound)?;
        Ok::<_, ActionError>(db.get_votes_by_chat_id(query.chat_id)?)
    })
    .await?;

    Ok(Json(votes))
}

async fn document_versions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    params: QueryParams<DocumentIdQuery>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let query = query_params(params)?;
    let versions = run_blocking(&state, move |db| {
        let versions = db.get_documents_by_id(query.id)?;
        match versions.last() {
            Some(latest) if latest.user_id == user.id => Ok(versions),
            _ => Err(ActionError::NotFound),
        }
    })
    .await?;

    Ok(Json(versions))
}

async fn suggestions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    params: QueryParams<SuggestionQuery>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    let query = query_params(params)?;
    let suggestions = run_blocking(&state, move |db| {
        db.get_document_by_id(query.document_id)?
            .filter(|document| document.user_id == user.id)
            .ok_or(ActionError::NotFound)?;
        Ok::<_, ActionError>(db.get_suggestions_by_document_id(query.document_id)?)
    })
    .await?;

    Ok(Json(suggestions))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn health_passes_the_gate_without_a_session() {
        let app = router(actions::testing::state());
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
