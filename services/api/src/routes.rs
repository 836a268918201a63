//! API service routes

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::HeaderMap,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::NaiveDateTime;
use serde_json::json;
use std::collections::HashMap;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::{
    accounts, directory,
    directory::RoomEventsQuery,
    error::{ApiError, ApiResult},
    middleware::{auth_middleware, authorization_header},
    models::{
        AddParticipantRequest, ChangeRoleRequest, CreateEventRequest, CreatedEvent, Event,
        EventDetail, LoginRequest, NewRoom, PatchEventRequest, RegisterRequest, Room,
        RoomSummary, TokenResponse, User,
    },
    participants,
    policy::{self, Caller},
    scheduling,
    state::AppState,
};

type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/room", post(add_room))
        .route("/event/:id/user", post(add_participant))
        .route("/user", get(current_user))
        .route("/user/events", get(current_user_events))
        .route("/user/:id", patch(change_user_role))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .route("/rooms", get(list_rooms))
        .route("/room/:id", get(get_room))
        .route("/room/:id/events", get(list_room_events))
        .route("/events", get(list_events))
        .route("/event", post(create_event))
        .route("/event/:id", get(get_event).patch(patch_event))
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Wall-clock time the scheduling rules are evaluated against
fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Parse an id path segment, reporting `not_found` for malformed values
fn parse_id(raw: &str, not_found: ApiError) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| not_found)
}

pub async fn hello() -> impl IntoResponse {
    Json("Hello World!")
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage = match state.store.health_check().await {
        Ok(true) => "ok",
        Ok(false) => "unavailable",
        Err(e) => {
            tracing::error!("Storage health check failed: {}", e);
            "unavailable"
        }
    };

    Json(json!({
        "status": "ok",
        "service": "api-service",
        "storage": storage
    }))
}

pub async fn list_rooms(State(state): State<AppState>) -> ApiResult<Json<Vec<RoomSummary>>> {
    Ok(Json(directory::list_rooms(state.store.as_ref()).await?))
}

pub async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Room>> {
    let room_id = parse_id(&id, ApiError::RoomNotFound)?;
    Ok(Json(directory::get_room(state.store.as_ref(), room_id).await?))
}

/// Add a room (Editor or Administrator)
pub async fn add_room(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: JsonBody<NewRoom>,
) -> ApiResult<impl IntoResponse> {
    policy::require_room_manager(&caller)?;
    let Json(room) = payload?;
    room.validate().map_err(ApiError::Validation)?;

    let room = state.store.insert_room(room).await?;
    info!("User {} added room {} ({})", caller.id, room.id, room.name);

    Ok(Json("The room has been added!"))
}

/// Events of a room: upcoming with `?limit=`, or on `?day=&month=&year=`
pub async fn list_room_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Vec<Event>>> {
    let room_id = parse_id(&id, ApiError::RoomNotFound)?;
    let query = RoomEventsQuery::from_params(&params)?;

    let events = directory::list_events_for_room(state.store.as_ref(), room_id, query, now()).await?;
    Ok(Json(events))
}

pub async fn list_events(State(state): State<AppState>) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(directory::list_events(state.store.as_ref()).await?))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<EventDetail>> {
    let event_id = parse_id(&id, ApiError::EventNotFound)?;
    Ok(Json(directory::get_event(state.store.as_ref(), event_id).await?))
}

/// Book an event; the bearer token is optional
pub async fn create_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: JsonBody<CreateEventRequest>,
) -> ApiResult<Json<CreatedEvent>> {
    let Json(request) = payload?;

    let created = scheduling::create_event(
        state.store.as_ref(),
        &state.jwt_service,
        request,
        authorization_header(&headers)?,
        now(),
    )
    .await?;

    Ok(Json(created))
}

/// Edit an event with its edit secret: `PATCH /event/{id}?password=...`
pub async fn patch_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    payload: JsonBody<PatchEventRequest>,
) -> ApiResult<Json<CreatedEvent>> {
    let edit_secret = match params.get("password") {
        Some(secret) if params.len() == 1 => secret,
        _ => {
            return Err(ApiError::BadRequest(
                "Invalid number of query parameters".to_string(),
            ));
        }
    };
    let event_id = parse_id(&id, ApiError::EventNotFound)?;
    let Json(request) = payload?;

    let patched =
        scheduling::patch_event(state.store.as_ref(), event_id, edit_secret, request, now())
            .await?;

    Ok(Json(patched))
}

/// Invite a registered user to an event (event owner only)
pub async fn add_participant(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    payload: JsonBody<AddParticipantRequest>,
) -> ApiResult<impl IntoResponse> {
    let event_id = parse_id(&id, ApiError::EventNotFound)?;
    let Json(request) = payload?;

    participants::add_participant(
        state.store.as_ref(),
        &caller,
        event_id,
        request.email.as_deref(),
    )
    .await?;

    Ok(Json("Participant had been added."))
}

pub async fn register(
    State(state): State<AppState>,
    payload: JsonBody<RegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(request) = payload?;
    let token = accounts::register(state.store.as_ref(), &state.jwt_service, request).await?;
    Ok(Json(token))
}

pub async fn login(
    State(state): State<AppState>,
    payload: JsonBody<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(request) = payload?;
    let token = accounts::login(state.store.as_ref(), &state.jwt_service, request).await?;
    Ok(Json(token))
}

/// Profile of the logged-in user
pub async fn current_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<User>> {
    Ok(Json(directory::get_user(state.store.as_ref(), caller.id).await?))
}

/// Events created by the logged-in user, `?limit=` up to 20
pub async fn current_user_events(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Vec<Event>>> {
    let limit = directory::parse_limit(&params)?;
    let events = directory::list_events_for_owner(state.store.as_ref(), caller.id, limit).await?;
    Ok(Json(events))
}

/// Change another user's role (Administrator only)
pub async fn change_user_role(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    payload: JsonBody<ChangeRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    policy::require_admin(&caller)?;
    let user_id = parse_id(&id, ApiError::UserNotFound("Invalid userId.".to_string()))?;
    let Json(request) = payload?;

    accounts::change_role(state.store.as_ref(), &caller, user_id, request.role_id).await?;

    Ok(Json("Role has been changed!"))
}
