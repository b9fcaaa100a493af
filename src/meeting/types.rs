use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::UserProfile;
use crate::shared::models::{Meeting, Membership};
use crate::video::RecordingRule;

use super::error::MeetingError;

pub const TITLE_MIN_LEN: usize = 3;
pub const TITLE_MAX_LEN: usize = 50;
pub const DESCRIPTION_MIN_LEN: usize = 5;
pub const DESCRIPTION_MAX_LEN: usize = 500;
pub const MAX_PARTICIPANTS_MIN: i32 = 1;
pub const MAX_PARTICIPANTS_MAX: i32 = 100;

/// Provider default applied when the payload leaves max_participants unset.
pub const DEFAULT_MAX_PARTICIPANTS: i32 = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMeetingRequest {
    pub title: String,
    pub description: String,
    pub group_urn: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub max_participants: Option<i32>,
    #[serde(default)]
    pub users: Vec<String>,
}

impl CreateMeetingRequest {
    /// Shape validation, run before the orchestrator acts. End time is
    /// deliberately not checked against start time.
    pub fn validate(&self) -> Result<(), MeetingError> {
        let title_len = self.title.chars().count();
        if !(TITLE_MIN_LEN..=TITLE_MAX_LEN).contains(&title_len) {
            return Err(MeetingError::InvalidInput(format!(
                "The title must be between {TITLE_MIN_LEN} and {TITLE_MAX_LEN} characters long"
            )));
        }
        let description_len = self.description.chars().count();
        if !(DESCRIPTION_MIN_LEN..=DESCRIPTION_MAX_LEN).contains(&description_len) {
            return Err(MeetingError::InvalidInput(format!(
                "The description must be between {DESCRIPTION_MIN_LEN} and {DESCRIPTION_MAX_LEN} characters long"
            )));
        }
        if let Some(max) = self.max_participants {
            if !(MAX_PARTICIPANTS_MIN..=MAX_PARTICIPANTS_MAX).contains(&max) {
                return Err(MeetingError::InvalidInput(format!(
                    "The maximum number of participants must be between {MAX_PARTICIPANTS_MIN} and {MAX_PARTICIPANTS_MAX}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InviteRequest {
    #[serde(rename = "userUrn")]
    pub user_urn: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingAction {
    Start,
    Stop,
}

impl MeetingAction {
    pub fn parse(action: &str) -> Result<Self, MeetingError> {
        match action {
            "start" => Ok(MeetingAction::Start),
            "stop" => Ok(MeetingAction::Stop),
            _ => Err(MeetingError::InvalidAction),
        }
    }
}

/// Result of a lifecycle toggle. Start hands back room access, stop just
/// confirms completion.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ToggleOutcome {
    Started {
        video_room_sid: String,
        access_token: String,
    },
    Stopped {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordingOutcome {
    pub message: String,
    pub updated_rules: Vec<RecordingRule>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteOutcome {
    pub meeting_id: Uuid,
    pub users: Vec<String>,
}

/// Read-path shape: the raw creator urn is replaced by a resolved profile
/// and member urns by the profiles that could be resolved.
#[derive(Debug, Clone, Serialize)]
pub struct MeetingDetails {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub group_urn: Option<String>,
    pub video_room_sid: String,
    pub max_participants: i32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub creator: Option<UserProfile>,
    pub users: Vec<UserProfile>,
}

impl MeetingDetails {
    pub fn from_parts(
        meeting: Meeting,
        creator: Option<UserProfile>,
        users: Vec<UserProfile>,
    ) -> Self {
        MeetingDetails {
            id: meeting.id,
            title: meeting.title,
            description: meeting.description,
            group_urn: meeting.group_urn,
            video_room_sid: meeting.video_room_sid,
            max_participants: meeting.max_participants,
            start_at: meeting.start_at,
            end_at: meeting.end_at,
            created_at: meeting.created_at,
            updated_at: meeting.updated_at,
            creator,
            users,
        }
    }
}

pub fn member_urns(members: &[Membership]) -> Vec<String> {
    members.iter().map(|m| m.user_urn.clone()).collect()
}
