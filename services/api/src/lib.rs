//! Room reservation HTTP service
//!
//! Rooms, time-bounded events booked into one or more rooms, user accounts
//! with roles and event participants, served as JSON over HTTP with bearer
//! token authentication.

pub mod accounts;
pub mod config;
pub mod directory;
pub mod error;
pub mod middleware;
pub mod models;
pub mod participants;
pub mod policy;
pub mod repositories;
pub mod routes;
pub mod scheduling;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
