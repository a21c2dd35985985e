use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Form;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::authentication::compute_password_hash;
use crate::session_state::TypedSession;
use crate::telemetry::spawn_blocking_with_tracing;
use crate::utils::error_chain_fmt;
use crate::AppState;

#[derive(Deserialize)]
pub struct SignupFormData {
    name: String,
    email: String,
    password: Secret<String>,
}

#[derive(thiserror::Error)]
pub enum SignupError {
    #[error("{0}")]
    ValidationError(String),
    #[error("An account with this email address already exists.")]
    EmailTaken,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for SignupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl IntoResponse for SignupError {
    fn into_response(self) -> Response {
        match self {
            Self::ValidationError(e) => (StatusCode::BAD_REQUEST, e).into_response(),
            Self::EmailTaken => (StatusCode::CONFLICT, self.to_string()).into_response(),
            Self::UnexpectedError(e) => {
                tracing::error!(error.cause_chain = ?e, "Failed to create an author account");
                (StatusCode::INTERNAL_SERVER_ERROR, "").into_response()
            }
        }
    }
}

#[tracing::instrument(
    name = "Create a new author account",
    skip(state, session, form),
    fields(email = %form.email)
)]
pub async fn signup(
    state: State<AppState>,
    session: TypedSession,
    form: Form<SignupFormData>,
) -> Result<Response, SignupError> {
    let SignupFormData {
        name,
        email,
        password,
    } = form.0;

    if name.trim().is_empty() {
        return Err(SignupError::ValidationError(
            "An author name must not be empty.".into(),
        ));
    }
    if !validator::validate_email(&email) {
        return Err(SignupError::ValidationError(format!(
            "{email} is not a valid email address."
        )));
    }
    let password_length = password.expose_secret().chars().count();
    if !(8..=128).contains(&password_length) {
        return Err(SignupError::ValidationError(
            "The password must be between 8 and 128 characters long.".into(),
        ));
    }

    let password_hash = spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("Failed to spawn blocking task.")?
        .map_err(SignupError::UnexpectedError)?;

    let user_id = insert_user(&state.pg_connection_pool, &name, &email, password_hash).await?;

    session.renew();
    session
        .insert_user_id(user_id)
        .map_err(SignupError::UnexpectedError)?;
    Ok(StatusCode::CREATED.into_response())
}

#[tracing::instrument(name = "Saving a new author in the database", skip(pg_pool, password_hash))]
async fn insert_user(
    pg_pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: Secret<String>,
) -> Result<Uuid, SignupError> {
    let user_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (user_id, email, name, password_hash, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(name)
    .bind(password_hash.expose_secret())
    .bind(chrono::Utc::now())
    .execute(pg_pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.constraint() == Some("users_email_key") => {
            SignupError::EmailTaken
        }
        _ => SignupError::UnexpectedError(
            anyhow::Error::from(e).context("Failed to store the new author."),
        ),
    })?;
    Ok(user_id)
}
