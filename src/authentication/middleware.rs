use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::ops::Deref;
use uuid::Uuid;

use crate::{session_state::TypedSession, utils::e500};

#[derive(Copy, Clone, Debug)]
pub struct UserId(pub Uuid);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Deref for UserId {
    type Target = Uuid;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub async fn reject_anonymous_users(
    session: TypedSession,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    match session.get_user_id().map_err(e500)? {
        Some(user_id) => {
            request.extensions_mut().insert(UserId(user_id));
            Ok(next.run(request).await)
        }
        None => Ok(StatusCode::UNAUTHORIZED.into_response()),
    }
}
