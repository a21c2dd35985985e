use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::utils::e500;
use crate::AppState;

#[derive(sqlx::FromRow, Serialize)]
pub struct ArticleRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub keywords: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn list_articles(state: State<AppState>) -> Result<Response, StatusCode> {
    let articles = get_all_articles(&state.pg_connection_pool)
        .await
        .map_err(e500)?;
    Ok(Json(articles).into_response())
}

pub async fn article_detail(
    state: State<AppState>,
    path: Path<Uuid>,
) -> Result<Response, StatusCode> {
    let article = get_article(&state.pg_connection_pool, path.0)
        .await
        .map_err(e500)?;
    match article {
        Some(article) => Ok(Json(article).into_response()),
        None => Err(StatusCode::NOT_FOUND),
    }
}

#[tracing::instrument(name = "Get all articles", skip(pg_pool))]
async fn get_all_articles(pg_pool: &PgPool) -> anyhow::Result<Vec<ArticleRecord>> {
    let articles = sqlx::query_as::<_, ArticleRecord>(
        r#"
        SELECT id, author_id, title, body, keywords, created_at, updated_at
        FROM articles
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pg_pool)
    .await
    .map_err(|e| anyhow::anyhow!(e))?;
    Ok(articles)
}

#[tracing::instrument(name = "Get an article", skip(pg_pool))]
async fn get_article(pg_pool: &PgPool, article_id: Uuid) -> anyhow::Result<Option<ArticleRecord>> {
    let article = sqlx::query_as::<_, ArticleRecord>(
        r#"
        SELECT id, author_id, title, body, keywords, created_at, updated_at
        FROM articles
        WHERE id = $1
        "#,
    )
    .bind(article_id)
    .fetch_optional(pg_pool)
    .await
    .map_err(|e| anyhow::anyhow!(e))?;
    Ok(article)
}
