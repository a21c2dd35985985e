use std::sync::Arc;

use sqlx::PgPool;
use unsubscribe_token::UnsubscribeTokenCodec;

pub mod authentication;
pub mod configuration;
pub mod delivery_worker;
pub mod domain;
pub mod email_client;
pub mod routes;
pub mod session_state;
pub mod startup;
pub mod telemetry;
pub mod unsubscribe_token;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pg_connection_pool: PgPool,
    pub unsubscribe_tokens: Arc<UnsubscribeTokenCodec>,
}
