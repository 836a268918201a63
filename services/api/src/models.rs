//! API models for request and response payloads
//!
//! JSON field names follow the public contract (`firstName`, `roomsId`,
//! `ownerId`, ...), so most types use `rename_all = "camelCase"`.

pub mod event;
pub mod room;
pub mod user;

pub use event::{
    CreateEventRequest, CreatedEvent, Event, EventDetail, NewEvent, PatchEventRequest,
};
pub use room::{Amenities, NewRoom, Room, RoomSummary};
pub use user::{
    AddParticipantRequest, ChangeRoleRequest, LoginRequest, NewUser, RegisterRequest,
    TokenResponse, User,
};

/// Textual timestamp layout used on the wire: `YYYY-MM-DDTHH:MM:SS`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Serde adapter for naive local timestamps in [`TIMESTAMP_FORMAT`]
pub mod timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(|_| {
            D::Error::custom(format!(
                "invalid timestamp '{}', expected YYYY-MM-DDTHH:MM:SS",
                raw
            ))
        })
    }
}
