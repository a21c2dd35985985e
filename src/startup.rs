use std::net::TcpListener;
use std::sync::Arc;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::BoxError;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use crate::authentication::reject_anonymous_users;
use crate::configuration::{DatabaseSettings, Settings};
use crate::routes::{
    article_detail, delete_article, health_check, list_articles, log_out, login, publish_article,
    signup, submit_contact_message, unsubscribe, update_article,
};
use crate::unsubscribe_token::UnsubscribeTokenCodec;
use crate::AppState;

pub struct Application {
    port: u16,
    listener: TcpListener,
    app: Router,
}

impl Application {
    pub fn build(configuration: Settings) -> anyhow::Result<Self> {
        let app_state = AppState {
            pg_connection_pool: get_connection_pool(&configuration.database),
            unsubscribe_tokens: Arc::new(UnsubscribeTokenCodec::new(
                configuration.application.unsubscribe_secret.clone(),
            )),
        };

        let address = format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        );
        let listener = TcpListener::bind(address)?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            port,
            listener,
            app: router(app_state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::from_std(self.listener)?;
        axum::serve(listener, self.app.into_make_service()).await?;
        Ok(())
    }
}

fn router(app_state: AppState) -> Router {
    let session_layer = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|_: BoxError| async {
            StatusCode::INTERNAL_SERVER_ERROR
        }))
        .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false));

    let authoring_routes = Router::new()
        .route("/admin/articles", post(publish_article))
        .route(
            "/admin/articles/:id",
            put(update_article).delete(delete_article),
        )
        .route("/admin/logout", post(log_out))
        .route_layer(middleware::from_fn(reject_anonymous_users));

    Router::new()
        .route("/health_check", get(health_check))
        .route("/contact", post(submit_contact_message))
        .route("/articles", get(list_articles))
        .route("/articles/:id", get(article_detail))
        // Mailed links carry a trailing slash; accept both spellings.
        .route("/unsubscribe/:token", get(unsubscribe))
        .route("/unsubscribe/:token/", get(unsubscribe))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .merge(authoring_routes)
        .layer(session_layer)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(app_state)
}

pub fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new().connect_lazy_with(configuration.with_db())
}
