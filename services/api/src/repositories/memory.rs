//! In-process storage backend
//!
//! Used by the test suite and for local runs without PostgreSQL
//! (`STORAGE_BACKEND=memory`). A scheduling transaction holds the store's
//! lock for its whole lifetime and works on a staged copy of the tables, so
//! concurrent scheduling is fully serialized and an uncommitted transaction
//! leaves no trace.

use async_trait::async_trait;
use auth::Role;
use common::error::{DatabaseError, DatabaseResult};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{ReservationStore, SchedulingTx};
use crate::models::{Event, NewRoom, NewUser, Room, User};

#[derive(Debug, Clone, Default)]
struct Tables {
    rooms: Vec<Room>,
    events: Vec<Event>,
    users: Vec<User>,
    /// (room_id, event_id)
    room_events: Vec<(Uuid, Uuid)>,
    /// (event_id, user_id)
    participants: Vec<(Uuid, Uuid)>,
}

impl Tables {
    fn find_event(&self, id: Uuid) -> Option<Event> {
        self.events.iter().find(|event| event.id == id).cloned()
    }

    fn events_in_room(&self, room_id: Uuid) -> Vec<Event> {
        self.room_events
            .iter()
            .filter(|(room, _)| *room == room_id)
            .filter_map(|(_, event_id)| self.find_event(*event_id))
            .collect()
    }

    fn rooms_of_event(&self, event_id: Uuid) -> Vec<Uuid> {
        self.room_events
            .iter()
            .filter(|(_, event)| *event == event_id)
            .map(|(room, _)| *room)
            .collect()
    }

    fn add_participant(&mut self, event_id: Uuid, user_id: Uuid) -> bool {
        let link = (event_id, user_id);
        if self.participants.contains(&link) {
            return false;
        }
        self.participants.push(link);
        true
    }
}

/// Storage backend kept in process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn begin(&self) -> DatabaseResult<Box<dyn SchedulingTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn insert_room(&self, room: NewRoom) -> DatabaseResult<Room> {
        let room = room.into_room(Uuid::new_v4());
        self.tables.lock().await.rooms.push(room.clone());
        Ok(room)
    }

    async fn list_rooms(&self) -> DatabaseResult<Vec<Room>> {
        Ok(self.tables.lock().await.rooms.clone())
    }

    async fn find_room(&self, id: Uuid) -> DatabaseResult<Option<Room>> {
        let tables = self.tables.lock().await;
        Ok(tables.rooms.iter().find(|room| room.id == id).cloned())
    }

    async fn list_events(&self) -> DatabaseResult<Vec<Event>> {
        Ok(self.tables.lock().await.events.clone())
    }

    async fn find_event(&self, id: Uuid) -> DatabaseResult<Option<Event>> {
        Ok(self.tables.lock().await.find_event(id))
    }

    async fn events_in_room(&self, room_id: Uuid) -> DatabaseResult<Vec<Event>> {
        Ok(self.tables.lock().await.events_in_room(room_id))
    }

    async fn events_owned_by(&self, owner_id: Uuid) -> DatabaseResult<Vec<Event>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .events
            .iter()
            .filter(|event| event.owner_id == Some(owner_id))
            .cloned()
            .collect())
    }

    async fn rooms_of_event(&self, event_id: Uuid) -> DatabaseResult<Vec<Uuid>> {
        Ok(self.tables.lock().await.rooms_of_event(event_id))
    }

    async fn participants_of_event(&self, event_id: Uuid) -> DatabaseResult<Vec<Uuid>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .participants
            .iter()
            .filter(|(event, _)| *event == event_id)
            .map(|(_, user)| *user)
            .collect())
    }

    async fn add_participant(&self, event_id: Uuid, user_id: Uuid) -> DatabaseResult<bool> {
        Ok(self.tables.lock().await.add_participant(event_id, user_id))
    }

    async fn insert_user(&self, user: NewUser) -> DatabaseResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|existing| existing.email == user.email) {
            return Err(DatabaseError::UniqueViolation(format!(
                "users.email = {}",
                user.email
            )));
        }

        let user = user.into_user(Uuid::new_v4());
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|user| user.email == email).cloned())
    }

    async fn update_user_role(&self, id: Uuid, role: Role) -> DatabaseResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.users.iter_mut().find(|user| user.id == id) {
            Some(user) => {
                user.role = role;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        Ok(true)
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl SchedulingTx for MemoryTx {
    async fn lock_room(&mut self, room_id: Uuid) -> DatabaseResult<Option<Room>> {
        Ok(self
            .staged
            .rooms
            .iter()
            .find(|room| room.id == room_id)
            .cloned())
    }

    async fn events_in_room(&mut self, room_id: Uuid) -> DatabaseResult<Vec<Event>> {
        Ok(self.staged.events_in_room(room_id))
    }

    async fn find_event(&mut self, id: Uuid) -> DatabaseResult<Option<Event>> {
        Ok(self.staged.find_event(id))
    }

    async fn rooms_of_event(&mut self, event_id: Uuid) -> DatabaseResult<Vec<Uuid>> {
        Ok(self.staged.rooms_of_event(event_id))
    }

    async fn find_user(&mut self, id: Uuid) -> DatabaseResult<Option<User>> {
        Ok(self.staged.users.iter().find(|user| user.id == id).cloned())
    }

    async fn insert_event(&mut self, event: &Event) -> DatabaseResult<()> {
        self.staged.events.push(event.clone());
        Ok(())
    }

    async fn update_event(&mut self, event: &Event) -> DatabaseResult<()> {
        if let Some(stored) = self.staged.events.iter_mut().find(|e| e.id == event.id) {
            stored.name = event.name.clone();
            stored.description = event.description.clone();
            stored.link = event.link.clone();
            stored.begin = event.begin;
            stored.end = event.end;
        }
        Ok(())
    }

    async fn set_event_rooms(&mut self, event_id: Uuid, room_ids: &[Uuid]) -> DatabaseResult<()> {
        self.staged
            .room_events
            .retain(|(_, event)| *event != event_id);
        for room_id in room_ids {
            let link = (*room_id, event_id);
            if !self.staged.room_events.contains(&link) {
                self.staged.room_events.push(link);
            }
        }
        Ok(())
    }

    async fn add_participant(&mut self, event_id: Uuid, user_id: Uuid) -> DatabaseResult<bool> {
        Ok(self.staged.add_participant(event_id, user_id))
    }

    async fn commit(self: Box<Self>) -> DatabaseResult<()> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
