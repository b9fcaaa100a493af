//! Client for the third-party video-room provider. Rooms are looked up and
//! mutated over REST; room access credentials are signed locally and never
//! touch the network.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::VideoConfig;

pub const ROOM_STATUS_IN_PROGRESS: &str = "in-progress";
pub const ROOM_STATUS_COMPLETED: &str = "completed";

/// Lifetime of an issued room access credential.
const ACCESS_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct Room {
    pub sid: String,
    #[serde(default)]
    pub unique_name: String,
    #[serde(default)]
    pub status: String,
}

/// Provider-side room state. Only `in-progress` matters to the meeting
/// lifecycle; every other provider state is carried opaquely.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomStatus {
    InProgress,
    Other(String),
}

impl RoomStatus {
    pub fn from_provider(status: &str) -> Self {
        if status == ROOM_STATUS_IN_PROGRESS {
            RoomStatus::InProgress
        } else {
            RoomStatus::Other(status.to_string())
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, RoomStatus::InProgress)
    }
}

/// Recording policy entry. The provider accepts a rule list but this system
/// only ever sends include-all or exclude-all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingRule {
    #[serde(rename = "type")]
    pub kind: String,
    pub all: bool,
}

impl RecordingRule {
    pub fn include_all() -> Self {
        RecordingRule {
            kind: "include".into(),
            all: true,
        }
    }

    pub fn exclude_all() -> Self {
        RecordingRule {
            kind: "exclude".into(),
            all: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("video provider signing credentials are missing")]
    MissingCredentials,
    #[error("video provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("video provider returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("failed to sign access credential: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

#[async_trait]
pub trait VideoApi: Send + Sync {
    /// Rooms matching a unique name, used for the pre-creation title check.
    async fn rooms_by_unique_name(&self, title: &str) -> Result<Vec<Room>, VideoError>;

    async fn create_room(&self, title: &str, max_participants: i32) -> Result<Room, VideoError>;

    async fn room_status(&self, room_sid: &str) -> Result<RoomStatus, VideoError>;

    /// Idempotent from the caller's perspective; setting an already-matching
    /// status is a provider-side no-op.
    async fn update_room_status(&self, room_sid: &str, status: &str) -> Result<(), VideoError>;

    async fn update_recording_rules(
        &self,
        room_sid: &str,
        rules: &[RecordingRule],
    ) -> Result<Vec<RecordingRule>, VideoError>;

    /// Sign a per-user room access credential. Purely local; fails only when
    /// the signing key material is absent (process misconfiguration).
    fn issue_access_token(&self, user_urn: &str, room_sid: &str) -> Result<String, VideoError>;
}

#[derive(Debug, Clone)]
pub struct TwilioVideoClient {
    config: VideoConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RoomListResponse {
    #[serde(default)]
    rooms: Vec<Room>,
}

#[derive(Debug, Deserialize)]
struct RecordingRulesResponse {
    #[serde(default)]
    rules: Vec<RecordingRule>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VideoGrant {
    room: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Grants {
    identity: String,
    video: VideoGrant,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    jti: String,
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
    grants: Grants,
}

impl TwilioVideoClient {
    pub fn new(config: VideoConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.api_url, path);
        self.http_client
            .request(method, url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, VideoError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(VideoError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl VideoApi for TwilioVideoClient {
    async fn rooms_by_unique_name(&self, title: &str) -> Result<Vec<Room>, VideoError> {
        let response = self
            .request(reqwest::Method::GET, "/v1/Rooms")
            .query(&[("UniqueName", title), ("Limit", "1")])
            .send()
            .await?;
        let response = Self::check(response).await?;
        let list: RoomListResponse = response.json().await?;
        Ok(list.rooms)
    }

    async fn create_room(&self, title: &str, max_participants: i32) -> Result<Room, VideoError> {
        let max = max_participants.to_string();
        let params = [
            ("UniqueName", title),
            ("Type", "group"),
            ("MaxParticipants", max.as_str()),
        ];
        let response = self
            .request(reqwest::Method::POST, "/v1/Rooms")
            .form(&params)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn room_status(&self, room_sid: &str) -> Result<RoomStatus, VideoError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/v1/Rooms/{room_sid}"))
            .send()
            .await?;
        let response = Self::check(response).await?;
        let room: Room = response.json().await?;
        Ok(RoomStatus::from_provider(&room.status))
    }

    async fn update_room_status(&self, room_sid: &str, status: &str) -> Result<(), VideoError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/v1/Rooms/{room_sid}"))
            .form(&[("Status", status)])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update_recording_rules(
        &self,
        room_sid: &str,
        rules: &[RecordingRule],
    ) -> Result<Vec<RecordingRule>, VideoError> {
        let encoded = serde_json::to_string(rules).unwrap_or_else(|_| "[]".to_string());
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/v1/Rooms/{room_sid}/RecordingRules"),
            )
            .form(&[("Rules", encoded.as_str())])
            .send()
            .await?;
        let response = Self::check(response).await?;
        let updated: RecordingRulesResponse = response.json().await?;
        Ok(updated.rules)
    }

    fn issue_access_token(&self, user_urn: &str, room_sid: &str) -> Result<String, VideoError> {
        if self.config.account_sid.is_empty()
            || self.config.api_key_sid.is_empty()
            || self.config.api_key_secret.is_empty()
        {
            return Err(VideoError::MissingCredentials);
        }

        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            jti: format!("{}-{}", self.config.api_key_sid, Uuid::new_v4()),
            iss: self.config.api_key_sid.clone(),
            sub: self.config.account_sid.clone(),
            iat: now,
            exp: now + ACCESS_TOKEN_TTL_SECS,
            grants: Grants {
                identity: user_urn.to_string(),
                video: VideoGrant {
                    room: room_sid.to_string(),
                },
            },
        };

        let mut header = Header::new(jsonwebtoken::Algorithm::HS256);
        header.cty = Some("twilio-fv=1".to_string());
        let key = EncodingKey::from_secret(self.config.api_key_secret.as_bytes());
        Ok(encode(&header, &claims, &key)?)
    }
}
