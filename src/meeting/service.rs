//! Meeting lifecycle orchestration across the identity service, the video
//! provider and the relational store. No cross-system transaction exists:
//! the provider room is created before the store row, so a store failure
//! can leave an orphaned room. That window is accepted, not reconciled.

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;
use log::{error, info, warn};
use uuid::Uuid;

use crate::core::{CoreUser, IdentityApi};
use crate::shared::models::{Meeting, NewMeeting};
use crate::video::{RecordingRule, VideoApi, ROOM_STATUS_COMPLETED, ROOM_STATUS_IN_PROGRESS};

use super::error::MeetingError;
use super::helper::MeetingHelper;
use super::store::MeetingRepository;
use super::types::{
    CreateMeetingRequest, InviteOutcome, MeetingAction, MeetingDetails, RecordingOutcome,
    ToggleOutcome, DEFAULT_MAX_PARTICIPANTS,
};

pub struct MeetingService {
    store: Arc<dyn MeetingRepository>,
    video: Arc<dyn VideoApi>,
    helper: MeetingHelper,
}

impl MeetingService {
    pub fn new(
        store: Arc<dyn MeetingRepository>,
        core: Arc<dyn IdentityApi>,
        video: Arc<dyn VideoApi>,
    ) -> Self {
        Self {
            store,
            video,
            helper: MeetingHelper::new(core),
        }
    }

    pub async fn create_meeting(
        &self,
        user: &CoreUser,
        mut data: CreateMeetingRequest,
    ) -> Result<Meeting, MeetingError> {
        data.validate()?;
        if data.group_urn.is_none() && data.users.is_empty() {
            return Err(MeetingError::InvalidInput("No users provided".into()));
        }

        let start_at = data.start_at.unwrap_or_else(Utc::now);
        let end_at = data.end_at.unwrap_or(start_at + Duration::hours(1));
        let max_participants = data.max_participants.unwrap_or(DEFAULT_MAX_PARTICIPANTS);

        // Title uniqueness is checked against the provider, not the local
        // store; two concurrent creates can still race past this check.
        let existing = self.video.rooms_by_unique_name(&data.title).await?;
        if !existing.is_empty() {
            return Err(MeetingError::RoomExists);
        }

        if let Some(group_urn) = data.group_urn.clone() {
            data.users = self.helper.resolve_group_members(&group_urn, user).await?;
        }

        let room = self.video.create_room(&data.title, max_participants).await?;

        let mut members = data.users.clone();
        if !members.contains(&user.urn) {
            members.push(user.urn.clone());
        }

        let record = NewMeeting {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            creator_urn: user.urn.clone(),
            group_urn: data.group_urn,
            video_room_sid: room.sid,
            max_participants,
            start_at,
            end_at,
        };
        let meeting = self.store.insert_meeting(record, members).await?;
        info!("Created meeting {} ({})", meeting.title, meeting.id);

        self.helper.notify_joins_best_effort(&data.users, user).await;

        Ok(meeting)
    }

    pub async fn list_meetings(&self, user: &CoreUser) -> Result<Vec<MeetingDetails>, MeetingError> {
        let rows = self.store.list_meetings().await?;
        Ok(self.format_all(rows, user).await)
    }

    pub async fn next_user_meetings(
        &self,
        user: &CoreUser,
    ) -> Result<Vec<MeetingDetails>, MeetingError> {
        let rows = self.store.find_meetings_for_user(&user.urn, true).await?;
        Ok(self.format_all(rows, user).await)
    }

    pub async fn get_meeting_by_id(
        &self,
        id: Uuid,
        user: &CoreUser,
    ) -> Result<MeetingDetails, MeetingError> {
        let (meeting, members) = self
            .store
            .find_meeting_with_members(id)
            .await?
            .ok_or(MeetingError::NotFound)?;
        Ok(self.helper.format_meeting(meeting, &members, user).await)
    }

    /// Start is open to any member and idempotent on the provider state; a
    /// fresh access credential is issued either way. Stop is creator-only.
    pub async fn toggle_meeting(
        &self,
        id: Uuid,
        user: &CoreUser,
        action: MeetingAction,
    ) -> Result<ToggleOutcome, MeetingError> {
        let meeting = self
            .store
            .find_meeting_for_member(id, &user.urn)
            .await?
            .ok_or(MeetingError::NotFound)?;

        match action {
            MeetingAction::Start => self.start_meeting(user, &meeting).await,
            MeetingAction::Stop if meeting.creator_urn == user.urn => {
                self.stop_meeting(&meeting).await
            }
            MeetingAction::Stop => Err(MeetingError::InvalidAction),
        }
    }

    async fn start_meeting(
        &self,
        user: &CoreUser,
        meeting: &Meeting,
    ) -> Result<ToggleOutcome, MeetingError> {
        let sid = meeting.video_room_sid.clone();
        let status = self.video.room_status(&sid).await?;
        let access_token = self.video.issue_access_token(&user.urn, &sid)?;
        if !status.is_in_progress() {
            self.video
                .update_room_status(&sid, ROOM_STATUS_IN_PROGRESS)
                .await?;
        }
        Ok(ToggleOutcome::Started {
            video_room_sid: sid,
            access_token,
        })
    }

    async fn stop_meeting(&self, meeting: &Meeting) -> Result<ToggleOutcome, MeetingError> {
        self.video
            .update_room_status(&meeting.video_room_sid, ROOM_STATUS_COMPLETED)
            .await?;
        Ok(ToggleOutcome::Stopped {
            message: "Meeting completed".into(),
        })
    }

    /// Recording is a creator-only facet, orthogonal to start/stop. The
    /// creator-filtered load means a foreign meeting reads as not found.
    pub async fn toggle_recording(
        &self,
        id: Uuid,
        user: &CoreUser,
        action: MeetingAction,
    ) -> Result<RecordingOutcome, MeetingError> {
        let meeting = self
            .store
            .find_meeting_as_creator(id, &user.urn)
            .await?
            .ok_or(MeetingError::NotFound)?;

        let (rules, message) = match action {
            MeetingAction::Start => (vec![RecordingRule::include_all()], "Recording started"),
            MeetingAction::Stop => (vec![RecordingRule::exclude_all()], "Recording stopped"),
        };

        match self
            .video
            .update_recording_rules(&meeting.video_room_sid, &rules)
            .await
        {
            Ok(updated_rules) => Ok(RecordingOutcome {
                message: message.into(),
                updated_rules,
            }),
            Err(e) => {
                error!("Recording update for meeting {id} failed: {e}");
                Err(MeetingError::RecordingUpdateFailed)
            }
        }
    }

    /// Single-invite path: a duplicate pair is rejected, and a notification
    /// failure surfaces without reverting the membership write.
    pub async fn add_user_to_meeting(
        &self,
        user: &CoreUser,
        meeting_id: Uuid,
        user_urn: String,
    ) -> Result<InviteOutcome, MeetingError> {
        self.store
            .find_meeting(meeting_id)
            .await?
            .ok_or(MeetingError::NotFound)?;

        self.store.add_membership(meeting_id, &user_urn).await?;
        self.helper.notify_join(user, &user_urn).await?;

        Ok(InviteOutcome {
            meeting_id,
            users: vec![user_urn],
        })
    }

    /// Bulk-invite path: duplicates are silently deduplicated. The single
    /// and bulk paths intentionally diverge here.
    pub async fn add_users_to_meeting(
        &self,
        user: &CoreUser,
        meeting_id: Uuid,
        users_to_invite: Vec<String>,
    ) -> Result<InviteOutcome, MeetingError> {
        self.store
            .find_meeting(meeting_id)
            .await?
            .ok_or(MeetingError::NotFound)?;

        self.store
            .add_memberships(meeting_id, users_to_invite.clone())
            .await?;

        let sends = users_to_invite
            .iter()
            .map(|urn| self.helper.notify_join(user, urn));
        for result in join_all(sends).await {
            result?;
        }

        Ok(InviteOutcome {
            meeting_id,
            users: users_to_invite,
        })
    }

    /// Marking the provider room completed is best-effort; the store delete
    /// is the authoritative step and supplies the not-found semantics.
    pub async fn delete_meeting(&self, id: Uuid) -> Result<(), MeetingError> {
        if let Some(meeting) = self.store.find_meeting(id).await? {
            if let Err(e) = self
                .video
                .update_room_status(&meeting.video_room_sid, ROOM_STATUS_COMPLETED)
                .await
            {
                warn!("Failed to end provider room for meeting {id}: {e}");
            }
        }

        self.store.delete_meeting_cascade(id).await?;
        info!("Deleted meeting {id}");
        Ok(())
    }

    async fn format_all(
        &self,
        rows: Vec<(Meeting, Vec<crate::shared::models::Membership>)>,
        user: &CoreUser,
    ) -> Vec<MeetingDetails> {
        let formats = rows
            .into_iter()
            .map(|(meeting, members)| async move {
                self.helper.format_meeting(meeting, &members, user).await
            })
            .collect::<Vec<_>>();
        join_all(formats).await
    }
}
