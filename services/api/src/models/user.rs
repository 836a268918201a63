//! Account models for the API service

use auth::Role;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account entity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(rename = "roleId")]
    pub role: Role,
}

/// New account creation payload, password already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

impl NewUser {
    pub fn into_user(self, id: Uuid) -> User {
        User {
            id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            role: self.role,
        }
    }
}

/// Payload of `POST /register`
///
/// Every field is optional at the JSON level so that a missing or `null`
/// field produces the registration error rather than a decoding error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
}

/// Payload of `POST /login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response for register and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Payload of `PATCH /user/{id}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleRequest {
    pub role_id: i64,
}

/// Payload of `POST /event/{id}/user`
#[derive(Debug, Clone, Deserialize)]
pub struct AddParticipantRequest {
    pub email: Option<String>,
}
