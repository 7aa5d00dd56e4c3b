use tracing::{debug, error, info};

use quill_types::state::{LoginActionState, RegisterActionState};

use crate::auth::{AuthError, SessionJar};
use crate::error::ActionError;
use crate::form::{Credentials, FormData};
use crate::state::{AppState, run_blocking};

/// Signs a user in. On success the session lands in `jar`.
pub async fn login(
    state: &AppState,
    jar: &mut SessionJar,
    _prev: LoginActionState,
    form: &FormData,
) -> LoginActionState {
    let creds = match Credentials::parse(form) {
        Ok(creds) => creds,
        Err(e) => {
            debug!("login rejected payload: {}", e);
            return LoginActionState::InvalidData;
        }
    };

    let auth = state.auth.clone();
    let outcome = run_blocking(state, move |db| {
        auth.sign_in(db, &creds.email, &creds.password)
    })
    .await;

    match outcome {
        Ok(session) => {
            let status = jar.store(session);
            debug!("login succeeded: {:?}", status);
            LoginActionState::Success
        }
        Err(ActionError::Auth(AuthError::InvalidCredentials)) => LoginActionState::Failed,
        Err(e) => {
            error!("login failed: {}", e);
            LoginActionState::Failed
        }
    }
}

/// Creates an account and signs it in.
pub async fn register(
    state: &AppState,
    jar: &mut SessionJar,
    _prev: RegisterActionState,
    form: &FormData,
) -> RegisterActionState {
    let creds = match Credentials::parse(form) {
        Ok(creds) => creds,
        Err(e) => {
            debug!("register rejected payload: {}", e);
            return RegisterActionState::InvalidData;
        }
    };

    let auth = state.auth.clone();
    let outcome = run_blocking(state, move |db| {
        auth.register(db, &creds.email, &creds.password)
    })
    .await;

    match outcome {
        Ok(session) => {
            info!("Registered user {}", session.user_id());
            jar.store(session);
            RegisterActionState::Success
        }
        Err(ActionError::Auth(AuthError::EmailTaken)) => RegisterActionState::UserExists,
        Err(e) => {
            error!("register failed: {}", e);
            RegisterActionState::Failed
        }
    }
}
