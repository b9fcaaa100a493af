//! HTTP surface for the meeting API. Handlers stay thin: decode, delegate
//! to the service, map the outcome to a response.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Extension, Json, Router};
use uuid::Uuid;

use crate::core::CoreUser;
use crate::shared::models::Meeting;
use crate::shared::state::AppState;

pub mod error;
pub mod helper;
pub mod service;
pub mod store;
pub mod types;

use error::MeetingError;
use types::{
    CreateMeetingRequest, InviteOutcome, InviteRequest, MeetingAction, MeetingDetails,
    RecordingOutcome, ToggleOutcome,
};

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/meetings", get(list_meetings).post(create_meeting))
        .route("/meetings/next-meetings", get(next_meetings))
        .route("/meetings/get-one/:id", get(get_meeting))
        .route("/meetings/:id/invite", post(invite_user))
        .route("/meetings/:id/recording/:action", put(toggle_recording))
        .route("/meetings/:id/:action", put(toggle_meeting))
        .route("/meetings/:id", delete(remove_meeting))
}

async fn list_meetings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CoreUser>,
) -> Result<Json<Vec<MeetingDetails>>, MeetingError> {
    Ok(Json(state.meetings.list_meetings(&user).await?))
}

async fn next_meetings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CoreUser>,
) -> Result<Json<Vec<MeetingDetails>>, MeetingError> {
    Ok(Json(state.meetings.next_user_meetings(&user).await?))
}

async fn get_meeting(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CoreUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<MeetingDetails>, MeetingError> {
    Ok(Json(state.meetings.get_meeting_by_id(id, &user).await?))
}

async fn create_meeting(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CoreUser>,
    Json(payload): Json<CreateMeetingRequest>,
) -> Result<(StatusCode, Json<Meeting>), MeetingError> {
    let meeting = state.meetings.create_meeting(&user, payload).await?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

async fn invite_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CoreUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<InviteRequest>,
) -> Result<Json<InviteOutcome>, MeetingError> {
    Ok(Json(
        state
            .meetings
            .add_user_to_meeting(&user, id, payload.user_urn)
            .await?,
    ))
}

async fn toggle_meeting(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CoreUser>,
    Path((id, action)): Path<(Uuid, String)>,
) -> Result<Json<ToggleOutcome>, MeetingError> {
    let action = MeetingAction::parse(&action)?;
    Ok(Json(state.meetings.toggle_meeting(id, &user, action).await?))
}

async fn toggle_recording(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CoreUser>,
    Path((id, action)): Path<(Uuid, String)>,
) -> Result<Json<RecordingOutcome>, MeetingError> {
    let action = MeetingAction::parse(&action)?;
    Ok(Json(
        state.meetings.toggle_recording(id, &user, action).await?,
    ))
}

async fn remove_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, MeetingError> {
    state.meetings.delete_meeting(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
