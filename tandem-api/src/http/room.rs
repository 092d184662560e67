//! Room reservation and lookup
//!
//! Rooms are normally created over the signaling channel; this REST surface
//! exists so a lobby page can mint a shareable code before anyone connects.
//! A reserved code expires after the reclaim grace window unless claimed.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tandem_core::models::{RoomCode, RoomSnapshot, SessionKind};

use crate::http::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub kind: SessionKind,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_id: RoomCode,
    pub kind: SessionKind,
    pub created_at: DateTime<Utc>,
}

/// POST /api/rooms — reserve a room code ahead of any connection
pub async fn create_room(
    State(state): State<AppState>,
    body: Option<Json<CreateRoomRequest>>,
) -> AppResult<Json<CreateRoomResponse>> {
    let kind = body.map_or_else(SessionKind::default, |Json(req)| req.kind);
    let snapshot = state.service.reserve_room(kind);

    Ok(Json(CreateRoomResponse {
        room_id: snapshot.room_id,
        kind: snapshot.kind,
        created_at: snapshot.created_at,
    }))
}

/// GET /api/rooms/{code} — current membership snapshot
pub async fn get_room(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<RoomSnapshot>> {
    let code = RoomCode::from_string(code);
    state
        .service
        .room_snapshot(&code)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("Room {code} not found")))
}
