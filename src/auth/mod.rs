//! Access-token middleware. The token travels as an `access_token` query
//! parameter and is exchanged with the identity service on every request;
//! the resolved identity rides the request as an extension.

use std::sync::Arc;

use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::debug;
use serde::Deserialize;

use crate::shared::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub access_token: Option<String>,
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "Invalid access token" })),
    )
        .into_response()
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuthQuery>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = query.access_token else {
        return unauthorized();
    };

    match state.core.current_user(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            debug!("Access token rejected: {e}");
            unauthorized()
        }
    }
}
