//! Client for the core identity service. Resolves access tokens to user
//! records, looks up public profiles by urn, expands group membership and
//! delivers join notifications.

use async_trait::async_trait;
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::config::CoreApiConfig;

/// Identity record resolved from an access token. The token itself is kept
/// alongside so downstream calls can act on the caller's behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreUser {
    pub urn: String,
    #[serde(default)]
    pub access_token: String,
    pub name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    pub email: String,
}

/// Externally visible profile shape, substituted for raw urns on read paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub urn: String,
    pub name: String,
    pub last_name: String,
    pub email: String,
}

impl From<CoreUser> for UserProfile {
    fn from(user: CoreUser) -> Self {
        UserProfile {
            urn: user.urn,
            name: user.name,
            last_name: user.last_name,
            email: user.email,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid access token")]
    Unauthorized,
    #[error("failed to retrieve group data: {0}")]
    Upstream(String),
    #[error("failed to send notification: {0}")]
    NotificationFailed(String),
}

#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Exchange an access token for the caller's identity record.
    async fn current_user(&self, access_token: &str) -> Result<CoreUser, CoreError>;

    /// Public profile for a urn. Any resolution failure yields `None`;
    /// this call never surfaces an error to its caller.
    async fn user_by_urn(&self, urn: &str, access_token: &str) -> Option<UserProfile>;

    /// All members of a group. Failures propagate as upstream errors.
    async fn group_members(
        &self,
        group_urn: &str,
        caller: &CoreUser,
    ) -> Result<Vec<UserProfile>, CoreError>;

    /// Deliver a notification to `target_urn` on behalf of `actor`.
    async fn send_notification(
        &self,
        kind: &str,
        date: &str,
        actor: &CoreUser,
        target_urn: &str,
    ) -> Result<(), CoreError>;
}

#[derive(Debug, Clone)]
pub struct CoreClient {
    config: CoreApiConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GroupMemberEnvelope {
    user: CoreUser,
}

impl CoreClient {
    pub fn new(config: CoreApiConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }
}

#[async_trait]
impl IdentityApi for CoreClient {
    async fn current_user(&self, access_token: &str) -> Result<CoreUser, CoreError> {
        let url = format!("{}/api/user", self.config.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("access_token", access_token)])
            .send()
            .await
            .map_err(|e| {
                error!("Error validating access token: {e}");
                CoreError::Unauthorized
            })?;

        if !response.status().is_success() {
            return Err(CoreError::Unauthorized);
        }

        let mut user: CoreUser = response.json().await.map_err(|e| {
            error!("Failed to parse identity response: {e}");
            CoreError::Unauthorized
        })?;
        if user.urn.is_empty() {
            return Err(CoreError::Unauthorized);
        }
        user.access_token = access_token.to_string();
        Ok(user)
    }

    async fn user_by_urn(&self, urn: &str, access_token: &str) -> Option<UserProfile> {
        let url = format!("{}/api/users/{}", self.config.base_url, urn);
        let response = self
            .http_client
            .get(&url)
            .query(&[("access_token", access_token)])
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            debug!("Profile lookup for {urn} returned {}", response.status());
            return None;
        }
        let user: CoreUser = response.json().await.ok()?;
        Some(user.into())
    }

    async fn group_members(
        &self,
        group_urn: &str,
        caller: &CoreUser,
    ) -> Result<Vec<UserProfile>, CoreError> {
        let url = format!("{}/api/groups/{}/members", self.config.base_url, group_urn);
        let response = self
            .http_client
            .get(&url)
            .query(&[("access_token", caller.access_token.as_str())])
            .send()
            .await
            .map_err(|e| CoreError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::Upstream(body));
        }

        let members: Vec<GroupMemberEnvelope> = response
            .json()
            .await
            .map_err(|e| CoreError::Upstream(e.to_string()))?;

        Ok(members.into_iter().map(|m| m.user.into()).collect())
    }

    async fn send_notification(
        &self,
        kind: &str,
        date: &str,
        actor: &CoreUser,
        target_urn: &str,
    ) -> Result<(), CoreError> {
        let url = format!("{}/api/notifications", self.config.base_url);
        let body = serde_json::json!({
            "type": kind,
            "date": date,
            "read": false,
            "actor": actor.urn,
            "participantUrn": target_urn,
        });

        let response = self
            .http_client
            .post(&url)
            .query(&[("access_token", actor.access_token.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::NotificationFailed(e.to_string()))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::NotificationFailed(body));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::Server) -> CoreClient {
        CoreClient::new(CoreApiConfig {
            base_url: server.url(),
        })
        .expect("client")
    }

    fn caller() -> CoreUser {
        CoreUser {
            urn: "urn:user:9".into(),
            access_token: "tok-9".into(),
            name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
        }
    }

    #[tokio::test]
    async fn test_current_user_attaches_token() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/user")
            .match_query(mockito::Matcher::UrlEncoded(
                "access_token".into(),
                "tok-1".into(),
            ))
            .with_body(
                r#"{"urn":"urn:user:1","name":"Grace","lastName":"Hopper","email":"grace@example.com"}"#,
            )
            .create_async()
            .await;

        let user = client_for(&server).current_user("tok-1").await.unwrap();
        assert_eq!(user.urn, "urn:user:1");
        assert_eq!(user.access_token, "tok-1");
        assert_eq!(user.last_name, "Hopper");
    }

    #[tokio::test]
    async fn test_current_user_rejects_bad_status() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/user")
            .with_status(401)
            .create_async()
            .await;

        let err = client_for(&server).current_user("bad").await.unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized));
    }

    #[tokio::test]
    async fn test_user_by_urn_is_none_on_failure() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/users/urn:user:2")
            .with_status(500)
            .create_async()
            .await;

        let profile = client_for(&server).user_by_urn("urn:user:2", "tok").await;
        assert!(profile.is_none());
    }

    #[tokio::test]
    async fn test_group_members_unwraps_envelopes() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/groups/urn:group:1/members")
            .match_query(mockito::Matcher::Any)
            .with_body(
                r#"[{"user":{"urn":"urn:user:1","name":"A","lastName":"B","email":"a@x.io"}},
                    {"user":{"urn":"urn:user:2","name":"C","lastName":"D","email":"c@x.io"}}]"#,
            )
            .create_async()
            .await;

        let members = client_for(&server)
            .group_members("urn:group:1", &caller())
            .await
            .unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].urn, "urn:user:1");
    }

    #[tokio::test]
    async fn test_group_members_propagates_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/api/groups/urn:group:x/members")
            .with_status(404)
            .with_body("group not found")
            .create_async()
            .await;

        let err = client_for(&server)
            .group_members("urn:group:x", &caller())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_send_notification_failure_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/notifications")
            .with_status(400)
            .create_async()
            .await;

        let err = client_for(&server)
            .send_notification("MEETING_JOIN", "2025-08-20T00:00:00Z", &caller(), "urn:user:3")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotificationFailed(_)));
    }
}
