//! Directory service: read-side queries over rooms, events and users

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{Event, EventDetail, Room, RoomSummary, User},
    repositories::ReservationStore,
};

/// Upper bound and default for limited event listings
pub const MAX_LIST_LIMIT: usize = 20;

const INVALID_LIMIT: &str = "Invalid value for limit parameter.";
const INVALID_DATE: &str = "Invalid value for date parameter.";

/// Listing mode of `GET /room/{id}/events`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomEventsQuery {
    /// Events that have not started yet, soonest first
    Upcoming { limit: usize },
    /// Every event beginning on the given calendar date
    OnDate(NaiveDate),
}

impl RoomEventsQuery {
    /// Pick the listing mode from raw query parameters
    ///
    /// More than one parameter selects the date mode (`day`, `month`,
    /// `year`); anything else is the limited upcoming listing.
    pub fn from_params(params: &HashMap<String, String>) -> ApiResult<Self> {
        if params.len() > 1 {
            let part = |name: &str| -> ApiResult<u32> {
                params
                    .get(name)
                    .and_then(|value| value.trim().parse().ok())
                    .ok_or_else(|| ApiError::BadRequest(INVALID_DATE.to_string()))
            };
            let year = params
                .get("year")
                .and_then(|value| value.trim().parse::<i32>().ok())
                .ok_or_else(|| ApiError::BadRequest(INVALID_DATE.to_string()))?;
            let date = NaiveDate::from_ymd_opt(year, part("month")?, part("day")?)
                .ok_or_else(|| ApiError::BadRequest(INVALID_DATE.to_string()))?;
            return Ok(Self::OnDate(date));
        }

        Ok(Self::Upcoming {
            limit: parse_limit(params)?,
        })
    }
}

/// Read the optional `limit` parameter, defaulting to [`MAX_LIST_LIMIT`]
pub fn parse_limit(params: &HashMap<String, String>) -> ApiResult<usize> {
    match params.get("limit") {
        None => Ok(MAX_LIST_LIMIT),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|limit| *limit <= MAX_LIST_LIMIT)
            .ok_or_else(|| ApiError::BadRequest(INVALID_LIMIT.to_string())),
    }
}

fn sorted_by_begin(mut events: Vec<Event>) -> Vec<Event> {
    events.sort_by_key(|event| event.begin);
    events
}

pub async fn list_rooms(store: &dyn ReservationStore) -> ApiResult<Vec<RoomSummary>> {
    let rooms = store.list_rooms().await?;
    Ok(rooms.into_iter().map(RoomSummary::from).collect())
}

pub async fn get_room(store: &dyn ReservationStore, room_id: Uuid) -> ApiResult<Room> {
    store
        .find_room(room_id)
        .await?
        .ok_or(ApiError::RoomNotFound)
}

/// Events booked in a room, according to `query`
pub async fn list_events_for_room(
    store: &dyn ReservationStore,
    room_id: Uuid,
    query: RoomEventsQuery,
    now: NaiveDateTime,
) -> ApiResult<Vec<Event>> {
    if store.find_room(room_id).await?.is_none() {
        return Err(ApiError::RoomNotFound);
    }

    let events = store.events_in_room(room_id).await?;
    let events = match query {
        RoomEventsQuery::Upcoming { limit } => sorted_by_begin(
            events
                .into_iter()
                .filter(|event| event.begin >= now)
                .collect(),
        )
        .into_iter()
        .take(limit)
        .collect(),
        RoomEventsQuery::OnDate(date) => sorted_by_begin(
            events
                .into_iter()
                .filter(|event| event.begin.date() == date)
                .collect(),
        ),
    };

    Ok(events)
}

/// Events created by `owner_id`, soonest first
pub async fn list_events_for_owner(
    store: &dyn ReservationStore,
    owner_id: Uuid,
    limit: usize,
) -> ApiResult<Vec<Event>> {
    let events = sorted_by_begin(store.events_owned_by(owner_id).await?);
    Ok(events.into_iter().take(limit).collect())
}

pub async fn list_events(store: &dyn ReservationStore) -> ApiResult<Vec<Event>> {
    Ok(sorted_by_begin(store.list_events().await?))
}

/// Event with its room and participant links
pub async fn get_event(store: &dyn ReservationStore, event_id: Uuid) -> ApiResult<EventDetail> {
    let event = store
        .find_event(event_id)
        .await?
        .ok_or(ApiError::EventNotFound)?;

    let mut room_ids = store.rooms_of_event(event_id).await?;
    room_ids.sort();
    let participant_ids = store.participants_of_event(event_id).await?;

    Ok(EventDetail {
        event,
        room_ids,
        participant_ids,
    })
}

pub async fn get_user(store: &dyn ReservationStore, user_id: Uuid) -> ApiResult<User> {
    store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::UserNotFound("Invalid userId.".to_string()))
}
