use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Form;
use secrecy::Secret;
use serde::Deserialize;

use crate::authentication::{validate_credentials, AuthError, Credentials};
use crate::session_state::TypedSession;
use crate::utils::error_chain_fmt;
use crate::AppState;

#[derive(Deserialize)]
pub struct LoginFormData {
    email: String,
    password: Secret<String>,
}

#[derive(thiserror::Error)]
pub enum LoginError {
    #[error("Authentication failed")]
    AuthError(#[source] anyhow::Error),
    #[error("Something went wrong")]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        match self {
            Self::AuthError(_) => StatusCode::UNAUTHORIZED.into_response(),
            Self::UnexpectedError(e) => {
                tracing::error!(error.cause_chain = ?e, "Failed to process a login attempt");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[tracing::instrument(
    skip(state, session, form),
    fields(email=tracing::field::Empty, user_id=tracing::field::Empty)
)]
pub async fn login(
    state: State<AppState>,
    session: TypedSession,
    form: Form<LoginFormData>,
) -> Result<Response, LoginError> {
    let credentials = Credentials {
        email: form.0.email,
        password: form.0.password,
    };
    tracing::Span::current().record("email", &tracing::field::display(&credentials.email));

    match validate_credentials(&state.pg_connection_pool, credentials).await {
        Ok(user_id) => {
            tracing::Span::current().record("user_id", &tracing::field::display(&user_id));
            session.renew();
            session
                .insert_user_id(user_id)
                .map_err(LoginError::UnexpectedError)?;
            Ok(StatusCode::OK.into_response())
        }
        Err(e) => match e {
            AuthError::InvalidCredentials(_) => Err(LoginError::AuthError(e.into())),
            AuthError::UnexpectedError(_) => Err(LoginError::UnexpectedError(e.into())),
        },
    }
}

pub async fn log_out(session: TypedSession) -> Response {
    session.log_out();
    StatusCode::OK.into_response()
}
