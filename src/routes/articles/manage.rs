use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use sqlx::PgPool;
use uuid::Uuid;

use crate::authentication::UserId;
use crate::domain::NewArticle;
use crate::utils::error_chain_fmt;
use crate::AppState;

use super::ArticleData;

#[derive(thiserror::Error)]
pub enum ManageArticleError {
    #[error("{0}")]
    ValidationError(String),
    #[error("There is no article with the requested id.")]
    NotFound,
    #[error("Only the author of an article may modify it.")]
    Forbidden,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for ManageArticleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl IntoResponse for ManageArticleError {
    fn into_response(self) -> Response {
        match self {
            Self::ValidationError(e) => (StatusCode::BAD_REQUEST, e).into_response(),
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Forbidden => {
                (StatusCode::FORBIDDEN, self.to_string()).into_response()
            }
            Self::UnexpectedError(e) => {
                tracing::error!(error.cause_chain = ?e, "Failed to modify an article");
                (StatusCode::INTERNAL_SERVER_ERROR, "").into_response()
            }
        }
    }
}

// Editing never re-notifies contacts; only the initial publication does.
#[tracing::instrument(
    name = "Update an article",
    skip(state, user_id, body),
    fields(user_id=%*user_id)
)]
pub async fn update_article(
    state: State<AppState>,
    user_id: Extension<UserId>,
    path: Path<Uuid>,
    body: Json<ArticleData>,
) -> Result<Response, ManageArticleError> {
    let article_id = path.0;
    let new_article = NewArticle::try_from(body.0).map_err(ManageArticleError::ValidationError)?;
    check_author(&state.pg_connection_pool, article_id, *user_id.0).await?;

    sqlx::query(
        r#"
        UPDATE articles
        SET title = $2, body = $3, keywords = $4, updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(article_id)
    .bind(&new_article.title)
    .bind(&new_article.body)
    .bind(&new_article.keywords)
    .execute(&state.pg_connection_pool)
    .await
    .context("Failed to update the article.")?;

    Ok(StatusCode::OK.into_response())
}

#[tracing::instrument(
    name = "Delete an article",
    skip(state, user_id),
    fields(user_id=%*user_id)
)]
pub async fn delete_article(
    state: State<AppState>,
    user_id: Extension<UserId>,
    path: Path<Uuid>,
) -> Result<Response, ManageArticleError> {
    let article_id = path.0;
    check_author(&state.pg_connection_pool, article_id, *user_id.0).await?;

    // Pending delivery tasks for the article go with it (FK cascade).
    sqlx::query(r#"DELETE FROM articles WHERE id = $1"#)
        .bind(article_id)
        .execute(&state.pg_connection_pool)
        .await
        .context("Failed to delete the article.")?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn check_author(
    pg_pool: &PgPool,
    article_id: Uuid,
    user_id: Uuid,
) -> Result<(), ManageArticleError> {
    let author_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT author_id
        FROM articles
        WHERE id = $1
        "#,
    )
    .bind(article_id)
    .fetch_optional(pg_pool)
    .await
    .context("Failed to look up the article's author.")?;

    match author_id {
        None => Err(ManageArticleError::NotFound),
        Some(author_id) if author_id != user_id => Err(ManageArticleError::Forbidden),
        Some(_) => Ok(()),
    }
}
