//! Identity and credential primitives for the room reservation service
//!
//! - [`jwt`]: stateless bearer tokens (issue and verify)
//! - [`password`]: argon2 hashing for account passwords and event edit secrets
//! - [`role`]: the closed set of account roles
//! - [`validation`]: registration input rules

pub mod jwt;
pub mod password;
pub mod role;
pub mod validation;

pub use jwt::{Claims, JwtConfig, JwtService, TokenError};
pub use role::Role;
