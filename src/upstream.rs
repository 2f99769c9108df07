//! Client for the external identity/auth server.
//!
//! The backend never verifies credentials or stores roles itself; it asks
//! the auth server per request. Struck/role checks are two independent
//! calls with no atomicity between them — accepted best-effort.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{mongodb::Id, role::Role};

/// Handle on the auth server, kept in managed state.
pub struct AuthServer {
    http: Client,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangeRole {
    user_id: Id,
    role: Role,
}

impl AuthServer {
    /// Build a client with a bounded per-request timeout. Construction fails
    /// only if the underlying TLS backend cannot initialise.
    pub fn new(base_url: String, timeout: Duration) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    /// Is this bearer token currently valid?
    pub async fn is_authenticated(&self, jwt: &str) -> Result<bool> {
        let response = self
            .http
            .get(format!("{}/Auth/ValidateToken", self.base_url))
            .bearer_auth(jwt)
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    /// The caller's role. A non-success status means the auth server could
    /// not resolve one, which callers treat as "no permission".
    pub async fn role(&self, jwt: &str) -> Result<Role> {
        let response = self
            .http
            .get(format!("{}/User/GetRoleForUser", self.base_url))
            .bearer_auth(jwt)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Forbidden(
                "no role could be resolved for this user".to_string(),
            ));
        }
        let body = response.text().await?;
        body.parse()
            .map_err(|()| Error::BadRequest(format!("unparsable role: {body}")))
    }

    /// Has this user been struck by moderation?
    pub async fn is_struck(&self, jwt: &str) -> Result<bool> {
        let response = self
            .http
            .get(format!("{}/User/IsUserStruck", self.base_url))
            .bearer_auth(jwt)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Upstream(
                "struck lookup returned a non-success status".to_string(),
            ));
        }
        Ok(response.text().await?.trim() == "true")
    }

    /// Record a strike against the given user.
    pub async fn strike(&self, jwt: &str, user_id: Id) -> Result<()> {
        let response = self
            .http
            .patch(format!(
                "{}/User/StrikeUser?strikedUserId={user_id}",
                self.base_url
            ))
            .bearer_auth(jwt)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Upstream(
                "strike returned a non-success status".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply an approved role change. The auth server owns the stored role;
    /// this backend only records the request paperwork.
    pub async fn change_role(&self, jwt: &str, user_id: Id, role: Role) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/User/ChangeRoleForUser", self.base_url))
            .bearer_auth(jwt)
            .json(&ChangeRole { user_id, role })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Upstream(
                "auth server refused the role change".to_string(),
            ));
        }
        Ok(())
    }
}
