use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;
use uuid::Uuid;

pub struct TypedSession(Session);

#[async_trait]
impl<S> FromRequestParts<S> for TypedSession
where
    S: Send + Sync,
{
    type Rejection = <Session as FromRequestParts<S>>::Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Session::from_request_parts(parts, state).await.map(Self)
    }
}

impl TypedSession {
    const USER_ID_KEY: &'static str = "user_id";

    pub fn renew(&self) {
        self.0.cycle_id();
    }

    pub fn insert_user_id(&self, user_id: Uuid) -> anyhow::Result<()> {
        self.0
            .insert(Self::USER_ID_KEY, user_id)
            .map_err(|e| anyhow::anyhow!(e))
    }

    pub fn get_user_id(&self) -> anyhow::Result<Option<Uuid>> {
        self.0
            .get(Self::USER_ID_KEY)
            .map_err(|e| anyhow::anyhow!(e))
    }

    pub fn log_out(self) {
        self.0.flush()
    }
}
