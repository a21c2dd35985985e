use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::authentication::UserId;
use crate::domain::NewArticle;
use crate::utils::error_chain_fmt;
use crate::AppState;

use super::ArticleRecord;

#[derive(Deserialize)]
pub struct ArticleData {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub keywords: String,
}

#[derive(thiserror::Error)]
pub enum PublishError {
    #[error("{0}")]
    ValidationError(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl IntoResponse for PublishError {
    fn into_response(self) -> Response {
        match self {
            Self::ValidationError(e) => (StatusCode::BAD_REQUEST, e).into_response(),
            Self::UnexpectedError(e) => {
                tracing::error!(error.cause_chain = ?e, "Failed to publish an article");
                (StatusCode::INTERNAL_SERVER_ERROR, "").into_response()
            }
        }
    }
}

type PgTransaction = Transaction<'static, Postgres>;

/// The article and its delivery queue entries commit together, before any
/// email is sent: publication is the source of truth and delivery is
/// best-effort work picked up by the background worker afterwards.
#[tracing::instrument(
    name = "Publish a new article",
    skip(state, user_id, body),
    fields(user_id=%*user_id)
)]
pub async fn publish_article(
    state: State<AppState>,
    user_id: Extension<UserId>,
    body: Json<ArticleData>,
) -> Result<Response, PublishError> {
    let new_article = NewArticle::try_from(body.0).map_err(PublishError::ValidationError)?;

    let mut transaction = state
        .pg_connection_pool
        .begin()
        .await
        .context("Failed to acquire a Postgres connection from the pool.")?;
    let article = insert_article(&mut transaction, *user_id.0, &new_article)
        .await
        .context("Failed to store the new article.")?;
    let enqueued = enqueue_delivery_tasks(&mut transaction, article.id)
        .await
        .context("Failed to enqueue notification delivery tasks.")?;
    transaction
        .commit()
        .await
        .context("Failed to commit the new article.")?;

    tracing::info!(
        article_id = %article.id,
        enqueued_notifications = enqueued,
        "A new article has been published"
    );
    Ok((StatusCode::CREATED, Json(article)).into_response())
}

#[tracing::instrument(name = "Saving a new article in the database", skip(transaction, new_article))]
async fn insert_article(
    transaction: &mut PgTransaction,
    author_id: Uuid,
    new_article: &NewArticle,
) -> Result<ArticleRecord, sqlx::Error> {
    let now = Utc::now();
    let article = ArticleRecord {
        id: Uuid::new_v4(),
        author_id,
        title: new_article.title.clone(),
        body: new_article.body.clone(),
        keywords: new_article.keywords.clone(),
        created_at: now,
        updated_at: now,
    };
    sqlx::query(
        r#"
        INSERT INTO articles (id, author_id, title, body, keywords, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(article.id)
    .bind(article.author_id)
    .bind(&article.title)
    .bind(&article.body)
    .bind(&article.keywords)
    .bind(article.created_at)
    .bind(article.updated_at)
    .execute(&mut **transaction)
    .await?;
    Ok(article)
}

// Consenting contacts are snapshotted inside the publish transaction; the
// (article_id, contact_id) primary key makes re-delivery attempts idempotent.
#[tracing::instrument(name = "Enqueue notification delivery tasks", skip(transaction))]
async fn enqueue_delivery_tasks(
    transaction: &mut PgTransaction,
    article_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO article_delivery_queue (article_id, contact_id)
        SELECT $1, id
        FROM contact_messages
        WHERE consent_email_updates = true
        "#,
    )
    .bind(article_id)
    .execute(&mut **transaction)
    .await?;
    Ok(result.rows_affected())
}
