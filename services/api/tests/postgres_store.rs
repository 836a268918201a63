//! Storage tests against a live PostgreSQL database
//!
//! Run with `cargo test -- --ignored` and `DATABASE_URL` pointing at a
//! disposable database. Every test creates its own rooms and users, so runs
//! can share one schema.

use api::{
    error::ApiError,
    models::{Amenities, CreateEventRequest, NewRoom, NewUser},
    repositories::{PgStore, ReservationStore},
    scheduling,
};
use auth::{JwtConfig, JwtService, Role};
use chrono::{NaiveDate, NaiveDateTime};
use common::{
    database::{DatabaseConfig, init_pool},
    error::DatabaseError,
};
use uuid::Uuid;

async fn store() -> PgStore {
    let config = DatabaseConfig::from_env().unwrap();
    let store = PgStore::new(init_pool(&config).await.unwrap());
    store.migrate().await.unwrap();
    store
}

fn jwt() -> JwtService {
    JwtService::new(JwtConfig {
        secret: "postgres-store-tests".to_string(),
        token_expiry: 3600,
    })
}

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2031, 3, 4)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2031, 3, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

async fn room(store: &PgStore, label: &str) -> Uuid {
    store
        .insert_room(NewRoom {
            name: format!("{label}-{}", Uuid::new_v4()),
            description: None,
            capacity: Some(6),
            amenities: Amenities {
                wifi: true,
                ..Amenities::default()
            },
        })
        .await
        .unwrap()
        .id
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        first_name: Some("Edsger".to_string()),
        last_name: Some("Dijkstra".to_string()),
        password_hash: "not-a-real-hash".to_string(),
        role: Role::Guest,
    }
}

fn unique_email() -> String {
    format!("{}@pg.test", Uuid::new_v4())
}

fn booking(name: &str, begin: NaiveDateTime, end: NaiveDateTime, rooms: Vec<Uuid>) -> CreateEventRequest {
    CreateEventRequest {
        name: name.to_string(),
        description: None,
        link: None,
        begin,
        end,
        rooms_id: rooms,
    }
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_create_event_persists_rooms_and_owner() {
    let store = store().await;
    let jwt = jwt();
    let a = room(&store, "a").await;
    let b = room(&store, "b").await;
    let owner = store.insert_user(new_user(&unique_email())).await.unwrap();
    let header = format!("Bearer {}", jwt.generate_token(owner.id).unwrap());

    let created = scheduling::create_event(
        &store,
        &jwt,
        booking("Planning", at(10, 0), at(11, 0), vec![a, b, a]),
        Some(&header),
        now(),
    )
    .await
    .unwrap();

    let event = store.find_event(created.id).await.unwrap().unwrap();
    assert_eq!(event.owner_id, Some(owner.id));
    assert_eq!((event.begin, event.end), (at(10, 0), at(11, 0)));

    let mut rooms = store.rooms_of_event(created.id).await.unwrap();
    rooms.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(rooms, expected);
    assert_eq!(store.participants_of_event(created.id).await.unwrap(), vec![owner.id]);
    assert_eq!(store.events_owned_by(owner.id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_conflict_in_later_room_leaves_no_rows() {
    let store = store().await;
    let jwt = jwt();
    let free = room(&store, "free").await;
    let busy = room(&store, "busy").await;

    scheduling::create_event(&store, &jwt, booking("First", at(10, 0), at(11, 0), vec![busy]), None, now())
        .await
        .unwrap();

    let marker = format!("Rejected-{}", Uuid::new_v4());
    let err = scheduling::create_event(
        &store,
        &jwt,
        booking(&marker, at(10, 30), at(11, 30), vec![free, busy]),
        None,
        now(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::SchedulingConflict));
    assert!(store.events_in_room(free).await.unwrap().is_empty());
    assert_eq!(store.events_in_room(busy).await.unwrap().len(), 1);
    assert!(
        !store
            .list_events()
            .await
            .unwrap()
            .iter()
            .any(|event| event.name == marker)
    );
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_duplicate_participant_is_reported() {
    let store = store().await;
    let a = room(&store, "participants").await;
    let guest = store.insert_user(new_user(&unique_email())).await.unwrap();
    let created = scheduling::create_event(&store, &jwt(), booking("Review", at(14, 0), at(15, 0), vec![a]), None, now())
        .await
        .unwrap();

    assert!(store.add_participant(created.id, guest.id).await.unwrap());
    assert!(!store.add_participant(created.id, guest.id).await.unwrap());
    assert_eq!(store.participants_of_event(created.id).await.unwrap(), vec![guest.id]);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_role_update_and_unique_email() {
    let store = store().await;
    let email = unique_email();
    let user = store.insert_user(new_user(&email)).await.unwrap();

    assert!(store.update_user_role(user.id, Role::Editor).await.unwrap());
    assert!(!store.update_user_role(Uuid::new_v4(), Role::Editor).await.unwrap());

    let stored = store.find_user_by_email(&email).await.unwrap().unwrap();
    assert_eq!(stored.id, user.id);
    assert_eq!(stored.role, Role::Editor);

    let err = store.insert_user(new_user(&email)).await.unwrap_err();
    assert!(matches!(err, DatabaseError::UniqueViolation(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_crossed_room_orders_do_not_deadlock() {
    let store = store().await;
    let jwt = jwt();
    let a = room(&store, "cross-a").await;
    let b = room(&store, "cross-b").await;

    let mut handles = Vec::new();
    for (hour, rooms) in [(9, vec![a, b]), (9, vec![b, a]), (12, vec![b, a]), (12, vec![a, b])] {
        let (store, jwt) = (store.clone(), jwt.clone());
        handles.push(tokio::spawn(async move {
            scheduling::create_event(&store, &jwt, booking("Cross", at(hour, 0), at(hour + 1, 0), rooms), None, now())
                .await
        }));
    }

    let mut booked = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => booked += 1,
            Err(err) => assert!(matches!(err, ApiError::SchedulingConflict), "{err}"),
        }
    }
    assert_eq!(booked, 2);
    assert_eq!(store.events_in_room(a).await.unwrap().len(), 2);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_dropped_transaction_rolls_back() {
    let store = store().await;
    let a = room(&store, "rollback").await;
    let created = scheduling::create_event(&store, &jwt(), booking("Kept", at(16, 0), at(17, 0), vec![a]), None, now())
        .await
        .unwrap();

    {
        let mut tx = store.begin().await.unwrap();
        let mut event = tx.find_event(created.id).await.unwrap().unwrap();
        event.name = "Discarded".to_string();
        tx.update_event(&event).await.unwrap();
    }

    let event = store.find_event(created.id).await.unwrap().unwrap();
    assert_eq!(event.name, "Kept");
}
