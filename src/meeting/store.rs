//! Persistence for meetings and memberships. The store owns data shape and
//! referential constraints only; lifecycle decisions live in the service.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use uuid::Uuid;

use crate::shared::models::{Meeting, Membership, NewMeeting, NewMembership};
use crate::shared::schema::{meeting_users, meetings};
use crate::shared::utils::DbPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("meeting not found")]
    NotFound,
    #[error("user is already a member of this meeting")]
    AlreadyMember,
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("blocking task failed: {0}")]
    Join(String),
}

#[async_trait]
pub trait MeetingRepository: Send + Sync {
    /// Insert the meeting and all initial membership rows in one
    /// transaction. Duplicate member urns are suppressed, the caller does
    /// not have to pre-deduplicate.
    async fn insert_meeting(
        &self,
        record: NewMeeting,
        members: Vec<String>,
    ) -> Result<Meeting, StoreError>;

    async fn find_meeting(&self, id: Uuid) -> Result<Option<Meeting>, StoreError>;

    async fn find_meeting_with_members(
        &self,
        id: Uuid,
    ) -> Result<Option<(Meeting, Vec<Membership>)>, StoreError>;

    /// Meeting visible to `urn` through a membership row.
    async fn find_meeting_for_member(
        &self,
        id: Uuid,
        urn: &str,
    ) -> Result<Option<Meeting>, StoreError>;

    /// `None` both when the meeting is absent and when it belongs to a
    /// different creator; callers never observe someone else's meeting here.
    async fn find_meeting_as_creator(
        &self,
        id: Uuid,
        creator_urn: &str,
    ) -> Result<Option<Meeting>, StoreError>;

    async fn list_meetings(&self) -> Result<Vec<(Meeting, Vec<Membership>)>, StoreError>;

    /// Meetings where `urn` is a member, ordered by start time ascending.
    async fn find_meetings_for_user(
        &self,
        urn: &str,
        only_future: bool,
    ) -> Result<Vec<(Meeting, Vec<Membership>)>, StoreError>;

    /// Single insert; an existing (meeting, user) pair is `AlreadyMember`.
    async fn add_membership(&self, meeting_id: Uuid, urn: &str) -> Result<(), StoreError>;

    /// Bulk insert that silently skips pairs that already exist.
    async fn add_memberships(&self, meeting_id: Uuid, urns: Vec<String>)
        -> Result<(), StoreError>;

    /// Membership rows first, then the meeting row, one transaction.
    async fn delete_meeting_cascade(&self, id: Uuid) -> Result<(), StoreError>;
}

pub struct PgMeetingStore {
    pool: DbPool,
}

impl PgMeetingStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

fn membership_rows(meeting_id: Uuid, urns: &[String]) -> Vec<NewMembership> {
    urns.iter()
        .map(|urn| NewMembership {
            id: Uuid::new_v4(),
            meeting_id,
            user_urn: urn.clone(),
        })
        .collect()
}

fn load_members_grouped(
    conn: &mut PgConnection,
    parents: Vec<Meeting>,
) -> Result<Vec<(Meeting, Vec<Membership>)>, StoreError> {
    let members = Membership::belonging_to(&parents)
        .select(Membership::as_select())
        .load(conn)?;
    let grouped = members.grouped_by(&parents);
    Ok(parents.into_iter().zip(grouped).collect())
}

#[async_trait]
impl MeetingRepository for PgMeetingStore {
    async fn insert_meeting(
        &self,
        record: NewMeeting,
        members: Vec<String>,
    ) -> Result<Meeting, StoreError> {
        self.run(move |conn| {
            conn.transaction(|conn| {
                let meeting: Meeting = diesel::insert_into(meetings::table)
                    .values(&record)
                    .returning(Meeting::as_returning())
                    .get_result(conn)?;

                diesel::insert_into(meeting_users::table)
                    .values(&membership_rows(meeting.id, &members))
                    .on_conflict_do_nothing()
                    .execute(conn)?;

                Ok(meeting)
            })
            .map_err(StoreError::Database)
        })
        .await
    }

    async fn find_meeting(&self, id: Uuid) -> Result<Option<Meeting>, StoreError> {
        self.run(move |conn| {
            Ok(meetings::table
                .find(id)
                .select(Meeting::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn find_meeting_with_members(
        &self,
        id: Uuid,
    ) -> Result<Option<(Meeting, Vec<Membership>)>, StoreError> {
        self.run(move |conn| {
            let meeting: Option<Meeting> = meetings::table
                .find(id)
                .select(Meeting::as_select())
                .first(conn)
                .optional()?;
            let Some(meeting) = meeting else {
                return Ok(None);
            };
            let members = Membership::belonging_to(&meeting)
                .select(Membership::as_select())
                .load(conn)?;
            Ok(Some((meeting, members)))
        })
        .await
    }

    async fn find_meeting_for_member(
        &self,
        id: Uuid,
        urn: &str,
    ) -> Result<Option<Meeting>, StoreError> {
        let urn = urn.to_string();
        self.run(move |conn| {
            Ok(meetings::table
                .inner_join(meeting_users::table)
                .filter(meetings::id.eq(id))
                .filter(meeting_users::user_urn.eq(urn))
                .select(Meeting::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn find_meeting_as_creator(
        &self,
        id: Uuid,
        creator_urn: &str,
    ) -> Result<Option<Meeting>, StoreError> {
        let creator_urn = creator_urn.to_string();
        self.run(move |conn| {
            Ok(meetings::table
                .find(id)
                .filter(meetings::creator_urn.eq(creator_urn))
                .select(Meeting::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    async fn list_meetings(&self) -> Result<Vec<(Meeting, Vec<Membership>)>, StoreError> {
        self.run(move |conn| {
            let parents: Vec<Meeting> = meetings::table
                .order(meetings::start_at.asc())
                .select(Meeting::as_select())
                .load(conn)?;
            load_members_grouped(conn, parents)
        })
        .await
    }

    async fn find_meetings_for_user(
        &self,
        urn: &str,
        only_future: bool,
    ) -> Result<Vec<(Meeting, Vec<Membership>)>, StoreError> {
        let urn = urn.to_string();
        self.run(move |conn| {
            let parents: Vec<Meeting> = if only_future {
                meetings::table
                    .inner_join(meeting_users::table)
                    .filter(meeting_users::user_urn.eq(urn))
                    .filter(meetings::start_at.gt(Utc::now()))
                    .order(meetings::start_at.asc())
                    .select(Meeting::as_select())
                    .distinct()
                    .load(conn)?
            } else {
                meetings::table
                    .inner_join(meeting_users::table)
                    .filter(meeting_users::user_urn.eq(urn))
                    .order(meetings::start_at.asc())
                    .select(Meeting::as_select())
                    .distinct()
                    .load(conn)?
            };
            load_members_grouped(conn, parents)
        })
        .await
    }

    async fn add_membership(&self, meeting_id: Uuid, urn: &str) -> Result<(), StoreError> {
        let urn = urn.to_string();
        self.run(move |conn| {
            let row = NewMembership {
                id: Uuid::new_v4(),
                meeting_id,
                user_urn: urn,
            };
            diesel::insert_into(meeting_users::table)
                .values(&row)
                .execute(conn)
                .map_err(|e| match e {
                    diesel::result::Error::DatabaseError(
                        DatabaseErrorKind::UniqueViolation,
                        _,
                    ) => StoreError::AlreadyMember,
                    other => StoreError::Database(other),
                })?;
            Ok(())
        })
        .await
    }

    async fn add_memberships(
        &self,
        meeting_id: Uuid,
        urns: Vec<String>,
    ) -> Result<(), StoreError> {
        self.run(move |conn| {
            diesel::insert_into(meeting_users::table)
                .values(&membership_rows(meeting_id, &urns))
                .on_conflict_do_nothing()
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn delete_meeting_cascade(&self, id: Uuid) -> Result<(), StoreError> {
        self.run(move |conn| {
            conn.transaction(|conn| {
                diesel::delete(meeting_users::table.filter(meeting_users::meeting_id.eq(id)))
                    .execute(conn)?;
                let deleted = diesel::delete(meetings::table.find(id)).execute(conn)?;
                if deleted == 0 {
                    return Err(StoreError::NotFound);
                }
                Ok(())
            })
        })
        .await
    }
}
