//! Session context and the auth collaborator
//!
//! Identity is an explicit value passed to the pieces that need one — there
//! is no ambient global. The auth service itself is external; this module
//! only resolves a bearer token into a [`SessionContext`].

use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::{CompletionsError, CompletionsResult};

/// The authenticated identity for one request
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub email: String,
}

/// Client for the external authentication/session service
#[derive(Clone)]
pub struct AuthClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct AuthUser {
    id: Uuid,
    email: String,
}

impl AuthClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Build from `AUTH_URL`. Returns `None` when unconfigured; callers
    /// that require identity must then reject the request.
    pub fn from_env() -> Option<Self> {
        std::env::var("AUTH_URL").ok().map(Self::new)
    }

    /// Resolve a bearer token into a session. Any non-success response from
    /// the auth service maps to an unauthorized error.
    pub async fn get_user(&self, token: &str) -> CompletionsResult<SessionContext> {
        let url = format!("{}/user", self.base_url.trim_end_matches('/'));
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            warn!(status = response.status().as_u16(), "Auth service rejected token");
            return Err(CompletionsError::Unauthorized);
        }

        let user: AuthUser = response.json().await?;
        Ok(SessionContext {
            user_id: user.id,
            email: user.email,
        })
    }
}
