use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use super::schema::{meeting_users, meetings};

/// A scheduled or in-progress video session. `video_room_sid` is assigned
/// exactly once when the provider room is created and never reassigned.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = meetings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Meeting {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub creator_urn: String,
    pub group_urn: Option<String>,
    pub video_room_sid: String,
    pub max_participants: i32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Join record between a meeting and a user urn, unique per pair.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Serialize)]
#[diesel(belongs_to(Meeting))]
#[diesel(table_name = meeting_users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Membership {
    pub id: Uuid,
    pub meeting_id: Uuid,
    pub user_urn: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = meetings)]
pub struct NewMeeting {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub creator_urn: String,
    pub group_urn: Option<String>,
    pub video_room_sid: String,
    pub max_participants: i32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = meeting_users)]
pub struct NewMembership {
    pub id: Uuid,
    pub meeting_id: Uuid,
    pub user_urn: String,
}
