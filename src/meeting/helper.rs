//! Read-path enrichment and notification fan-out. Profile lookups run
//! concurrently and individual failures never abort sibling lookups.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use log::warn;

use crate::core::{CoreUser, IdentityApi, UserProfile};
use crate::shared::models::{Meeting, Membership};

use super::error::MeetingError;
use super::types::{member_urns, MeetingDetails};

pub const NOTIFICATION_MEETING_JOIN: &str = "MEETING_JOIN";

pub struct MeetingHelper {
    core: Arc<dyn IdentityApi>,
}

impl MeetingHelper {
    pub fn new(core: Arc<dyn IdentityApi>) -> Self {
        Self { core }
    }

    /// Resolve a group urn to its member urns. The caller's supplied users
    /// list is replaced, not merged, with the result.
    pub async fn resolve_group_members(
        &self,
        group_urn: &str,
        user: &CoreUser,
    ) -> Result<Vec<String>, MeetingError> {
        let members = self.core.group_members(group_urn, user).await?;
        Ok(members.into_iter().map(|m| m.urn).collect())
    }

    /// Join-notification fan-out after meeting creation. Best-effort:
    /// failures are logged and never fail the enclosing request.
    pub async fn notify_joins_best_effort(&self, urns: &[String], actor: &CoreUser) {
        let date = Utc::now().to_rfc3339();
        let sends = urns.iter().map(|urn| {
            let date = date.clone();
            async move {
                self.core
                    .send_notification(NOTIFICATION_MEETING_JOIN, &date, actor, urn)
                    .await
            }
        });
        for (urn, result) in urns.iter().zip(join_all(sends).await) {
            if let Err(e) = result {
                warn!("Join notification to {urn} failed: {e}");
            }
        }
    }

    /// Single join notification on the invite path; failure surfaces to the
    /// caller (the membership write is not reverted).
    pub async fn notify_join(&self, actor: &CoreUser, target_urn: &str) -> Result<(), MeetingError> {
        self.core
            .send_notification(
                NOTIFICATION_MEETING_JOIN,
                &Utc::now().to_rfc3339(),
                actor,
                target_urn,
            )
            .await?;
        Ok(())
    }

    pub async fn formatted_user(&self, urn: &str, access_token: &str) -> Option<UserProfile> {
        self.core.user_by_urn(urn, access_token).await
    }

    /// Profiles for a list of urns; unresolvable entries are dropped.
    pub async fn formatted_users(&self, urns: &[String], access_token: &str) -> Vec<UserProfile> {
        let lookups = urns.iter().map(|urn| self.formatted_user(urn, access_token));
        join_all(lookups).await.into_iter().flatten().collect()
    }

    /// Enrich a meeting with creator and member profiles, fetched jointly.
    pub async fn format_meeting(
        &self,
        meeting: Meeting,
        members: &[Membership],
        caller: &CoreUser,
    ) -> MeetingDetails {
        let urns = member_urns(members);
        let (users, creator) = tokio::join!(
            self.formatted_users(&urns, &caller.access_token),
            self.formatted_user(&meeting.creator_urn, &caller.access_token),
        );
        MeetingDetails::from_parts(meeting, creator, users)
    }
}
