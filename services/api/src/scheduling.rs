//! Scheduling engine
//!
//! Validates proposed time windows, detects collisions with the events
//! already booked in each requested room and commits an event together with
//! its room links in a single transaction. A rejected request leaves storage
//! exactly as it was, even when some of the requested rooms were free.

use auth::{JwtService, password};
use chrono::{Duration, NaiveDateTime};
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{CreateEventRequest, CreatedEvent, Event, NewEvent, PatchEventRequest},
    policy,
    repositories::{ReservationStore, SchedulingTx},
};

/// Shortest bookable event
pub const MIN_EVENT_DURATION_MINUTES: i64 = 15;

/// Half-open booking interval `[begin, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub begin: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(begin: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { begin, end }
    }

    /// Check the window rules in order; the first violated rule is reported
    pub fn validate(&self, now: NaiveDateTime) -> ApiResult<()> {
        if self.begin >= self.end {
            return Err(ApiError::InvalidTimeWindow);
        }
        if self.end - self.begin < Duration::minutes(MIN_EVENT_DURATION_MINUTES) {
            return Err(ApiError::DurationTooShort);
        }
        if self.begin.date() != self.end.date() {
            return Err(ApiError::CrossDayEvent);
        }
        if self.begin <= now {
            return Err(ApiError::BeginNotInFuture);
        }
        Ok(())
    }

    /// Whether two windows share any instant; touching endpoints do not
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.begin < other.end && self.end > other.begin
    }
}

impl From<&Event> for TimeWindow {
    fn from(event: &Event) -> Self {
        Self::new(event.begin, event.end)
    }
}

/// Ensure every room exists and is free for `window`
///
/// Rooms are locked in ascending id order before any check runs, so two
/// requests naming the same rooms in different orders cannot deadlock.
/// Errors are still reported in request order. `ignore` excludes an event
/// from the comparison (the one being edited).
async fn check_rooms_available(
    tx: &mut dyn SchedulingTx,
    room_ids: &[Uuid],
    window: TimeWindow,
    ignore: Option<Uuid>,
) -> ApiResult<()> {
    let mut lock_order = room_ids.to_vec();
    lock_order.sort_unstable();
    lock_order.dedup();

    let mut existing = HashSet::with_capacity(lock_order.len());
    for room_id in lock_order {
        if tx.lock_room(room_id).await?.is_some() {
            existing.insert(room_id);
        }
    }

    for room_id in room_ids {
        if !existing.contains(room_id) {
            return Err(ApiError::RoomNotFound);
        }

        let booked = tx.events_in_room(*room_id).await?;
        if let Some(existing) = booked
            .iter()
            .filter(|event| Some(event.id) != ignore)
            .find(|event| window.overlaps(&TimeWindow::from(*event)))
        {
            warn!(
                "Room {} is already booked by event {} ({} - {})",
                room_id, existing.id, existing.begin, existing.end
            );
            return Err(ApiError::SchedulingConflict);
        }
    }

    Ok(())
}

/// Create an event in every requested room
///
/// Checks run in this order and the first failure wins: the time window
/// rules, then each room in request order (existence, then collisions),
/// then the optional caller token. Without an `Authorization` header the
/// event is created without an owner.
pub async fn create_event(
    store: &dyn ReservationStore,
    jwt: &JwtService,
    request: CreateEventRequest,
    authorization: Option<&str>,
    now: NaiveDateTime,
) -> ApiResult<CreatedEvent> {
    if request.rooms_id.is_empty() {
        return Err(ApiError::Validation(
            "At least one room must be provided.".to_string(),
        ));
    }

    let window = TimeWindow::new(request.begin, request.end);
    window.validate(now)?;

    let mut tx = store.begin().await?;
    check_rooms_available(tx.as_mut(), &request.rooms_id, window, None).await?;

    let owner_id = match authorization {
        None => None,
        Some(header) => {
            let token = policy::bearer_token(Some(header))?;
            let user_id = policy::verify_token(jwt, token)?;
            if tx.find_user(user_id).await?.is_none() {
                return Err(ApiError::Unauthorized(
                    "User with provided token doesnt exist.".to_string(),
                ));
            }
            Some(user_id)
        }
    };

    let secret = password::generate_edit_secret();
    let event = NewEvent {
        name: request.name,
        description: request.description,
        link: request.link,
        begin: window.begin,
        end: window.end,
        owner_id,
        edit_password_hash: password::hash_password(&secret)?,
    }
    .into_event(Uuid::new_v4());

    tx.insert_event(&event).await?;
    tx.set_event_rooms(event.id, &request.rooms_id).await?;
    if let Some(owner_id) = owner_id {
        tx.add_participant(event.id, owner_id).await?;
    }
    tx.commit().await?;

    info!(
        "Event {} booked in {} room(s) for {} - {}",
        event.id,
        request.rooms_id.len(),
        event.begin,
        event.end
    );

    Ok(CreatedEvent {
        id: event.id,
        password: secret,
    })
}

/// Edit an event, authorised by its edit secret
///
/// The new window must satisfy the same rules as on creation and must not
/// collide with other events in the event's rooms (or in `roomsId` when the
/// request replaces the room set).
pub async fn patch_event(
    store: &dyn ReservationStore,
    event_id: Uuid,
    edit_secret: &str,
    request: PatchEventRequest,
    now: NaiveDateTime,
) -> ApiResult<CreatedEvent> {
    let mut tx = store.begin().await?;

    let mut event = tx
        .find_event(event_id)
        .await?
        .ok_or(ApiError::EventNotFound)?;

    if !password::verify_password(edit_secret, &event.edit_password_hash)? {
        warn!("Rejected edit of event {}: wrong edit secret", event_id);
        return Err(ApiError::InvalidPassword);
    }

    let window = TimeWindow::new(request.begin, request.end);
    window.validate(now)?;

    if matches!(&request.rooms_id, Some(rooms) if rooms.is_empty()) {
        return Err(ApiError::Validation(
            "At least one room must be provided.".to_string(),
        ));
    }
    let room_ids = match &request.rooms_id {
        Some(rooms) => rooms.clone(),
        None => tx.rooms_of_event(event_id).await?,
    };
    check_rooms_available(tx.as_mut(), &room_ids, window, Some(event_id)).await?;

    event.name = request.name;
    event.description = request.description;
    event.link = request.link;
    event.begin = window.begin;
    event.end = window.end;

    tx.update_event(&event).await?;
    if request.rooms_id.is_some() {
        tx.set_event_rooms(event_id, &room_ids).await?;
    }
    tx.commit().await?;

    info!("Event {} updated to {} - {}", event_id, event.begin, event.end);

    Ok(CreatedEvent {
        id: event_id,
        password: edit_secret.to_string(),
    })
}
