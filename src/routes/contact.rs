use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Form;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::NewContactMessage;
use crate::AppState;

#[derive(Deserialize)]
pub struct ContactFormData {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub message: String,
    #[serde(default)]
    pub consent_email_updates: bool,
}

#[tracing::instrument(
    name = "Adding a new contact message",
    skip(form, state),
    fields(
        contact_email = %form.email,
        contact_name = %form.name,
    )
)]
pub async fn submit_contact_message(state: State<AppState>, form: Form<ContactFormData>) -> Response {
    let new_contact_message: NewContactMessage = match form.0.try_into() {
        Ok(m) => m,
        Err(e) => return (StatusCode::BAD_REQUEST, e).into_response(),
    };
    match insert_contact_message(&new_contact_message, &state.pg_connection_pool).await {
        Ok(_) => (StatusCode::OK, "").into_response(),
        Err(e) => {
            tracing::error!("Failed to store a contact message: {e:?}");
            (StatusCode::INTERNAL_SERVER_ERROR, "").into_response()
        }
    }
}

#[tracing::instrument(
    name = "Saving a new contact message in the database",
    skip(new_contact_message, pg_pool)
)]
pub async fn insert_contact_message(
    new_contact_message: &NewContactMessage,
    pg_pool: &PgPool,
) -> Result<Uuid, sqlx::Error> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO contact_messages (id, name, email, phone, message, consent_email_updates, submitted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(new_contact_message.name.as_ref())
    .bind(new_contact_message.email.as_ref())
    .bind(&new_contact_message.phone)
    .bind(&new_contact_message.message)
    .bind(new_contact_message.consent_email_updates)
    .bind(chrono::Utc::now())
    .execute(pg_pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to execute query: {e:?}");
        e
    })?;
    Ok(id)
}
