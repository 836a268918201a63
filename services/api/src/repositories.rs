//! Repositories for database operations
//!
//! Operations never reach a global connection: they receive a
//! [`ReservationStore`] handle through the application state. Writes that
//! depend on a prior read (event scheduling) go through a [`SchedulingTx`],
//! which either commits as a whole or leaves storage untouched when dropped.

use async_trait::async_trait;
use auth::Role;
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{Event, NewRoom, NewUser, Room, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage handle shared by every request
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Open a transactional unit for check-then-write scheduling
    async fn begin(&self) -> DatabaseResult<Box<dyn SchedulingTx>>;

    async fn insert_room(&self, room: NewRoom) -> DatabaseResult<Room>;

    /// All rooms, in creation order
    async fn list_rooms(&self) -> DatabaseResult<Vec<Room>>;

    async fn find_room(&self, id: Uuid) -> DatabaseResult<Option<Room>>;

    async fn list_events(&self) -> DatabaseResult<Vec<Event>>;

    async fn find_event(&self, id: Uuid) -> DatabaseResult<Option<Event>>;

    /// Events linked to a room, in no particular order
    async fn events_in_room(&self, room_id: Uuid) -> DatabaseResult<Vec<Event>>;

    async fn events_owned_by(&self, owner_id: Uuid) -> DatabaseResult<Vec<Event>>;

    async fn rooms_of_event(&self, event_id: Uuid) -> DatabaseResult<Vec<Uuid>>;

    async fn participants_of_event(&self, event_id: Uuid) -> DatabaseResult<Vec<Uuid>>;

    /// Link a participant; `false` when the pair already exists
    async fn add_participant(&self, event_id: Uuid, user_id: Uuid) -> DatabaseResult<bool>;

    /// Fails with `DatabaseError::UniqueViolation` when the email is taken
    async fn insert_user(&self, user: NewUser) -> DatabaseResult<User>;

    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    /// Change a user's role; `false` when the user does not exist
    async fn update_user_role(&self, id: Uuid, role: Role) -> DatabaseResult<bool>;

    async fn health_check(&self) -> DatabaseResult<bool>;
}

/// Transaction used by the scheduling engine
///
/// Reads observe the transaction's own staged writes. Nothing is visible to
/// other requests before [`SchedulingTx::commit`].
#[async_trait]
pub trait SchedulingTx: Send {
    /// Fetch a room and hold it against concurrent scheduling until the
    /// transaction ends
    ///
    /// Callers lock rooms in ascending id order, after at most one event
    /// row, so concurrent transactions always acquire locks in the same
    /// order.
    async fn lock_room(&mut self, room_id: Uuid) -> DatabaseResult<Option<Room>>;

    async fn events_in_room(&mut self, room_id: Uuid) -> DatabaseResult<Vec<Event>>;

    async fn find_event(&mut self, id: Uuid) -> DatabaseResult<Option<Event>>;

    async fn rooms_of_event(&mut self, event_id: Uuid) -> DatabaseResult<Vec<Uuid>>;

    async fn find_user(&mut self, id: Uuid) -> DatabaseResult<Option<User>>;

    async fn insert_event(&mut self, event: &Event) -> DatabaseResult<()>;

    /// Overwrite name, description, link and time window
    async fn update_event(&mut self, event: &Event) -> DatabaseResult<()>;

    /// Replace the room set of an event; repeated ids are linked once
    async fn set_event_rooms(&mut self, event_id: Uuid, room_ids: &[Uuid]) -> DatabaseResult<()>;

    async fn add_participant(&mut self, event_id: Uuid, user_id: Uuid) -> DatabaseResult<bool>;

    async fn commit(self: Box<Self>) -> DatabaseResult<()>;
}
