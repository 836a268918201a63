//! Room models for the API service

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed amenity flags of a room
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amenities {
    pub projector: bool,
    /// Air conditioning
    pub conditioning: bool,
    pub tv: bool,
    pub ethernet: bool,
    pub wifi: bool,
    pub whiteboard: bool,
}

/// Bookable room, full projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub capacity: Option<i32>,
    #[serde(flatten)]
    pub amenities: Amenities,
}

/// Short projection used by the room listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub capacity: Option<i32>,
}

impl From<Room> for RoomSummary {
    fn from(room: Room) -> Self {
        Self {
            id: room.id,
            name: room.name,
            description: room.description,
            capacity: room.capacity,
        }
    }
}

/// Payload of `POST /room`
#[derive(Debug, Clone, Deserialize)]
pub struct NewRoom {
    pub name: String,
    pub description: Option<String>,
    pub capacity: Option<i32>,
    #[serde(flatten)]
    pub amenities: Amenities,
}

impl NewRoom {
    /// Reject rooms that could never be listed meaningfully
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Room name must be provided.".to_string());
        }

        if matches!(self.capacity, Some(capacity) if capacity < 0) {
            return Err("Room capacity cannot be negative.".to_string());
        }

        Ok(())
    }

    pub fn into_room(self, id: Uuid) -> Room {
        Room {
            id,
            name: self.name,
            description: self.description,
            capacity: self.capacity,
            amenities: self.amenities,
        }
    }
}
