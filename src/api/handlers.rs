use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::request_context::RequestId;
use crate::models::{ContentId, ListField, ListState, SessionIdentity, WatchedEntry};
use crate::services::{SyncStatus, Toast};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct SwitchSessionRequest {
    /// Signed-in user, or `null` to continue as a guest
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub identity: Option<SessionIdentity>,
    pub status: SyncStatus,
    pub degraded: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddItemRequest {
    /// Only used for the watched list; defaults to unrated
    pub rating: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i32,
}

#[derive(Debug, Serialize)]
pub struct ListsResponse {
    pub watchlist: Vec<ContentId>,
    pub watched: Vec<WatchedEntry>,
    pub favorites: Vec<ContentId>,
    pub loading: bool,
}

impl ListsResponse {
    fn new(lists: &ListState, loading: bool) -> Self {
        Self {
            watchlist: lists.watchlist().iter().cloned().collect(),
            watched: lists.watched().iter().cloned().collect(),
            favorites: lists.favorites().iter().cloned().collect(),
            loading,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub list: String,
    pub id: ContentId,
    pub present: bool,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Describe the current session
pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    Json(SessionResponse {
        identity: state.lists.identity(),
        status: state.lists.status(),
        degraded: state.lists.is_degraded(),
    })
}

/// Sign in, sign out or switch user, reloading the lists
pub async fn switch_session(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<SwitchSessionRequest>,
) -> Json<ListsResponse> {
    let identity = SessionIdentity::from_user_id(request.user_id);

    tracing::info!(request_id = %request_id, identity = %identity, "Switching session");

    let lists = state.lists.load(identity).await;
    Json(ListsResponse::new(&lists, state.lists.is_loading()))
}

/// Get all three lists
pub async fn get_lists(State(state): State<AppState>) -> Json<ListsResponse> {
    let lists = state.lists.snapshot();
    Json(ListsResponse::new(&lists, state.lists.is_loading()))
}

/// Check whether an item is on a list
pub async fn contains_item(
    State(state): State<AppState>,
    Path((list, id)): Path<(String, String)>,
) -> AppResult<Json<MembershipResponse>> {
    let field: ListField = list.parse()?;
    let id = ContentId::from(id);

    let present = match field {
        ListField::Watchlist => state.lists.is_in_watchlist(&id),
        ListField::Watched => state.lists.is_in_watched(&id),
        ListField::Favorites => state.lists.is_favorite(&id),
    };

    Ok(Json(MembershipResponse {
        list: field.to_string(),
        id,
        present,
    }))
}

/// Add an item to a list
pub async fn add_item(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((list, id)): Path<(String, String)>,
    body: Bytes,
) -> AppResult<Json<ListsResponse>> {
    let field: ListField = list.parse()?;
    // An empty body means no options
    let request = if body.is_empty() {
        AddItemRequest::default()
    } else {
        let Json(request) = Json::<AddItemRequest>::from_bytes(&body)?;
        request
    };

    tracing::info!(request_id = %request_id, list = %field, id = %id, "Adding item");

    let lists = match field {
        ListField::Watchlist => state.lists.add_to_watchlist(id).await,
        ListField::Watched => state.lists.add_to_watched(id, request.rating).await,
        ListField::Favorites => state.lists.add_to_favorites(id).await,
    };

    Ok(Json(ListsResponse::new(&lists, state.lists.is_loading())))
}

/// Remove an item from a list
pub async fn remove_item(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((list, id)): Path<(String, String)>,
) -> AppResult<Json<ListsResponse>> {
    let field: ListField = list.parse()?;

    tracing::info!(request_id = %request_id, list = %field, id = %id, "Removing item");

    let lists = match field {
        ListField::Watchlist => state.lists.remove_from_watchlist(id).await,
        ListField::Watched => state.lists.remove_from_watched(id).await,
        ListField::Favorites => state.lists.remove_from_favorites(id).await,
    };

    Ok(Json(ListsResponse::new(&lists, state.lists.is_loading())))
}

/// Change the rating of a watched item
pub async fn update_rating(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path((list, id)): Path<(String, String)>,
    Json(request): Json<RatingRequest>,
) -> AppResult<Json<ListsResponse>> {
    let field: ListField = list.parse()?;
    if field != ListField::Watched {
        return Err(AppError::InvalidInput(format!(
            "ratings only apply to the watched list, not '{}'",
            field
        )));
    }

    tracing::info!(
        request_id = %request_id,
        id = %id,
        rating = request.rating,
        "Updating rating"
    );

    let lists = state.lists.update_watched_rating(id, request.rating).await;
    Ok(Json(ListsResponse::new(&lists, state.lists.is_loading())))
}

/// Get visible notifications, newest first
pub async fn get_notifications(State(state): State<AppState>) -> Json<Vec<Toast>> {
    Json(state.toasts.active())
}

/// Dismiss a notification
pub async fn dismiss_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if state.toasts.dismiss(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("notification {}", id)))
    }
}
