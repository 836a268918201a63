//! PostgreSQL storage backend

use async_trait::async_trait;
use auth::Role;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use tracing::info;
use uuid::Uuid;

use super::{ReservationStore, SchedulingTx};
use crate::models::{Amenities, Event, NewRoom, NewUser, Room, User};

const ROOM_COLUMNS: &str = "id, name, description, capacity, projector, conditioning, tv, ethernet, wifi, whiteboard";
const EVENT_COLUMNS: &str =
    "e.id, e.name, e.description, e.link, e.begin_at, e.end_at, e.owner_id, e.edit_password_hash";
const USER_COLUMNS: &str = "id, email, first_name, last_name, password_hash, role_id";

fn room_from_row(row: &PgRow) -> Room {
    Room {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        capacity: row.get("capacity"),
        amenities: Amenities {
            projector: row.get("projector"),
            conditioning: row.get("conditioning"),
            tv: row.get("tv"),
            ethernet: row.get("ethernet"),
            wifi: row.get("wifi"),
            whiteboard: row.get("whiteboard"),
        },
    }
}

fn event_from_row(row: &PgRow) -> Event {
    Event {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        link: row.get("link"),
        begin: row.get("begin_at"),
        end: row.get("end_at"),
        owner_id: row.get("owner_id"),
        edit_password_hash: row.get("edit_password_hash"),
    }
}

fn user_from_row(row: &PgRow) -> DatabaseResult<User> {
    let role_id: i16 = row.get("role_id");
    let role = Role::try_from(role_id)
        .map_err(|e| DatabaseError::CorruptRow(format!("users.role_id = {}", e.0)))?;

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        password_hash: row.get("password_hash"),
        role,
    })
}

/// Storage backend on a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store on an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Bring the schema up to date
    pub async fn migrate(&self) -> DatabaseResult<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(DatabaseError::Migration)
    }
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn begin(&self) -> DatabaseResult<Box<dyn SchedulingTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn insert_room(&self, room: NewRoom) -> DatabaseResult<Room> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO rooms (id, name, description, capacity, projector, conditioning, tv, ethernet, wifi, whiteboard)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ROOM_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&room.name)
        .bind(&room.description)
        .bind(room.capacity)
        .bind(room.amenities.projector)
        .bind(room.amenities.conditioning)
        .bind(room.amenities.tv)
        .bind(room.amenities.ethernet)
        .bind(room.amenities.wifi)
        .bind(room.amenities.whiteboard)
        .fetch_one(&self.pool)
        .await?;

        Ok(room_from_row(&row))
    }

    async fn list_rooms(&self) -> DatabaseResult<Vec<Room>> {
        let rows = sqlx::query(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(room_from_row).collect())
    }

    async fn find_room(&self, id: Uuid) -> DatabaseResult<Option<Room>> {
        let row = sqlx::query(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(room_from_row))
    }

    async fn list_events(&self) -> DatabaseResult<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e ORDER BY e.created_at, e.id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(event_from_row).collect())
    }

    async fn find_event(&self, id: Uuid) -> DatabaseResult<Option<Event>> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(event_from_row))
    }

    async fn events_in_room(&self, room_id: Uuid) -> DatabaseResult<Vec<Event>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events e
            JOIN room_events re ON re.event_id = e.id
            WHERE re.room_id = $1
            "#
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(event_from_row).collect())
    }

    async fn events_owned_by(&self, owner_id: Uuid) -> DatabaseResult<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE e.owner_id = $1"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(event_from_row).collect())
    }

    async fn rooms_of_event(&self, event_id: Uuid) -> DatabaseResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT room_id FROM room_events WHERE event_id = $1")
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    async fn participants_of_event(&self, event_id: Uuid) -> DatabaseResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM user_events WHERE event_id = $1 ORDER BY created_at",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn add_participant(&self, event_id: Uuid, user_id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_events (user_id, event_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_user(&self, user: NewUser) -> DatabaseResult<User> {
        info!("Creating new user: {}", user.email);

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (id, email, first_name, last_name, password_hash, role_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.role.id())
        .fetch_one(&self.pool)
        .await?;

        user_from_row(&row)
    }

    async fn find_user_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_user_role(&self, id: Uuid, role: Role) -> DatabaseResult<bool> {
        let result = sqlx::query("UPDATE users SET role_id = $1, updated_at = NOW() WHERE id = $2")
            .bind(role.id())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> DatabaseResult<bool> {
        common::database::health_check(&self.pool).await
    }
}

/// Scheduling transaction on a single pooled connection
struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SchedulingTx for PgTx {
    async fn lock_room(&mut self, room_id: Uuid) -> DatabaseResult<Option<Room>> {
        // Row lock serializes concurrent scheduling into the same room
        let row = sqlx::query(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1 FOR UPDATE"
        ))
        .bind(room_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(room_from_row))
    }

    async fn events_in_room(&mut self, room_id: Uuid) -> DatabaseResult<Vec<Event>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events e
            JOIN room_events re ON re.event_id = e.id
            WHERE re.room_id = $1
            "#
        ))
        .bind(room_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.iter().map(event_from_row).collect())
    }

    async fn find_event(&mut self, id: Uuid) -> DatabaseResult<Option<Event>> {
        let row = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.as_ref().map(event_from_row))
    }

    async fn rooms_of_event(&mut self, event_id: Uuid) -> DatabaseResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT room_id FROM room_events WHERE event_id = $1")
            .bind(event_id)
            .fetch_all(&mut *self.tx)
            .await?;

        Ok(ids)
    }

    async fn find_user(&mut self, id: Uuid) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_event(&mut self, event: &Event) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, name, description, link, begin_at, end_at, owner_id, edit_password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.link)
        .bind(event.begin)
        .bind(event.end)
        .bind(event.owner_id)
        .bind(&event.edit_password_hash)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_event(&mut self, event: &Event) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE events
            SET name = $1, description = $2, link = $3, begin_at = $4, end_at = $5, updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.link)
        .bind(event.begin)
        .bind(event.end)
        .bind(event.id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn set_event_rooms(&mut self, event_id: Uuid, room_ids: &[Uuid]) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM room_events WHERE event_id = $1")
            .bind(event_id)
            .execute(&mut *self.tx)
            .await?;

        for room_id in room_ids {
            sqlx::query(
                r#"
                INSERT INTO room_events (room_id, event_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(*room_id)
            .bind(event_id)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn add_participant(&mut self, event_id: Uuid, user_id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_events (user_id, event_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> DatabaseResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
