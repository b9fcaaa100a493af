use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::core::CoreError;
use crate::meeting::store::StoreError;
use crate::video::VideoError;

#[derive(Debug, Clone)]
pub enum MeetingError {
    InvalidInput(String),
    NotFound,
    Forbidden,
    RoomExists,
    AlreadyMember,
    InvalidAction,
    GroupLookupFailed(String),
    NotificationFailed,
    RecordingUpdateFailed,
    Upstream(String),
    Internal,
}

impl std::fmt::Display for MeetingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "Invalid input: {msg}"),
            Self::NotFound => write!(f, "Meeting not found"),
            Self::Forbidden => write!(f, "Permission denied: not the meeting creator"),
            Self::RoomExists => write!(f, "Room already exists"),
            Self::AlreadyMember => write!(f, "User already in meeting"),
            Self::InvalidAction => write!(f, "Invalid action or permission denied"),
            Self::GroupLookupFailed(msg) => write!(f, "Failed to retrieve group data: {msg}"),
            Self::NotificationFailed => write!(f, "Failed to send notification"),
            Self::RecordingUpdateFailed => write!(f, "Failed to update recording"),
            Self::Upstream(msg) => write!(f, "Upstream service failed: {msg}"),
            Self::Internal => write!(f, "Internal server error"),
        }
    }
}

impl std::error::Error for MeetingError {}

impl IntoResponse for MeetingError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            Self::InvalidInput(_)
            | Self::InvalidAction
            | Self::GroupLookupFailed(_)
            | Self::NotificationFailed => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::RoomExists | Self::AlreadyMember => StatusCode::CONFLICT,
            Self::RecordingUpdateFailed | Self::Upstream(_) | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for MeetingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => MeetingError::NotFound,
            StoreError::AlreadyMember => MeetingError::AlreadyMember,
            StoreError::Pool(e) => {
                log::error!("Database pool error: {e}");
                MeetingError::Internal
            }
            StoreError::Database(e) => {
                log::error!("Database error: {e}");
                MeetingError::Internal
            }
            StoreError::Join(e) => {
                log::error!("Blocking task error: {e}");
                MeetingError::Internal
            }
        }
    }
}

impl From<CoreError> for MeetingError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotificationFailed(e) => {
                log::error!("Notification delivery failed: {e}");
                MeetingError::NotificationFailed
            }
            CoreError::Upstream(e) => MeetingError::GroupLookupFailed(e),
            CoreError::Unauthorized => MeetingError::Forbidden,
        }
    }
}

impl From<VideoError> for MeetingError {
    fn from(err: VideoError) -> Self {
        match err {
            VideoError::MissingCredentials => {
                log::error!("Video provider signing credentials are missing");
                MeetingError::Internal
            }
            other => MeetingError::Upstream(other.to_string()),
        }
    }
}
