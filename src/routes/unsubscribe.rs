use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use sqlx::PgPool;
use uuid::Uuid;

use crate::utils::error_chain_fmt;
use crate::AppState;

#[derive(thiserror::Error)]
pub enum UnsubscribeError {
    #[error("Invalid or expired link.")]
    InvalidLink,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for UnsubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl IntoResponse for UnsubscribeError {
    fn into_response(self) -> Response {
        match self {
            // Bad signatures and unknown contacts share one message so the
            // response never reveals whether a contact record exists.
            Self::InvalidLink => {
                (StatusCode::BAD_REQUEST, "Invalid or expired link.").into_response()
            }
            Self::UnexpectedError(e) => {
                tracing::error!(error.cause_chain = ?e, "Failed to process an unsubscribe request");
                (StatusCode::INTERNAL_SERVER_ERROR, "").into_response()
            }
        }
    }
}

#[tracing::instrument(name = "Unsubscribe a contact", skip(state, token))]
pub async fn unsubscribe(
    state: State<AppState>,
    token: Path<String>,
) -> Result<Response, UnsubscribeError> {
    let contact_id = state
        .unsubscribe_tokens
        .verify(&token.0)
        .map_err(|_| UnsubscribeError::InvalidLink)?;

    let contact = withdraw_consent(&state.pg_connection_pool, contact_id)
        .await
        .context("Failed to update the contact's consent flag.")?
        .ok_or(UnsubscribeError::InvalidLink)?;

    let body = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta http-equiv="content-type" content="text/html; charset=utf-8">
    <title>Unsubscribed</title>
</head>
<body>
    <p>You have been unsubscribed.</p>
    <p>{} ({}) will no longer receive article updates.</p>
</body>
</html>"#,
        contact.name, contact.email
    );
    Ok(Html(body).into_response())
}

#[derive(sqlx::FromRow)]
struct UnsubscribedContact {
    name: String,
    email: String,
}

// A single UPDATE keeps the consent flip atomic with the existence check;
// running it again for the same contact is a no-op that still succeeds.
#[tracing::instrument(name = "Withdraw a contact's email consent", skip(pg_pool))]
async fn withdraw_consent(
    pg_pool: &PgPool,
    contact_id: Uuid,
) -> Result<Option<UnsubscribedContact>, sqlx::Error> {
    sqlx::query_as::<_, UnsubscribedContact>(
        r#"
        UPDATE contact_messages
        SET consent_email_updates = false
        WHERE id = $1
        RETURNING name, email
        "#,
    )
    .bind(contact_id)
    .fetch_optional(pg_pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute query: {e:?}");
        e
    })
}
