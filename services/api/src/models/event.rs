//! Event models for the API service

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timestamp;

/// Reservation occupying one or more rooms
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub link: Option<String>,
    #[serde(with = "timestamp")]
    pub begin: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub end: NaiveDateTime,
    /// `None` for events created without a logged-in owner
    pub owner_id: Option<Uuid>,
    #[serde(skip)]
    pub edit_password_hash: String,
}

/// Event as built by the scheduling engine before it is stored
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub begin: NaiveDateTime,
    pub end: NaiveDateTime,
    pub owner_id: Option<Uuid>,
    pub edit_password_hash: String,
}

impl NewEvent {
    pub fn into_event(self, id: Uuid) -> Event {
        Event {
            id,
            name: self.name,
            description: self.description,
            link: self.link,
            begin: self.begin,
            end: self.end,
            owner_id: self.owner_id,
            edit_password_hash: self.edit_password_hash,
        }
    }
}

/// Event detail including its room and participant associations
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    #[serde(flatten)]
    pub event: Event,
    pub room_ids: Vec<Uuid>,
    pub participant_ids: Vec<Uuid>,
}

/// Payload of `POST /event`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: String,
    pub description: Option<String>,
    pub link: Option<String>,
    #[serde(with = "timestamp")]
    pub begin: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub end: NaiveDateTime,
    pub rooms_id: Vec<Uuid>,
}

/// Payload of `PATCH /event/{id}`
///
/// `roomsId` is optional; when present it replaces the event's room set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchEventRequest {
    pub name: String,
    pub description: Option<String>,
    pub link: Option<String>,
    #[serde(with = "timestamp")]
    pub begin: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub end: NaiveDateTime,
    #[serde(default)]
    pub rooms_id: Option<Vec<Uuid>>,
}

/// Answer to a successful create or patch
///
/// On creation this is the only time the plaintext edit secret is revealed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedEvent {
    pub id: Uuid,
    pub password: String,
}
