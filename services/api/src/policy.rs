//! Access control policy
//!
//! Turns an `Authorization` header into an authenticated [`Caller`] and
//! enforces the role and ownership gates. Every check is stateless: the
//! token is verified on each request and the caller's role is re-read from
//! storage.

use auth::{JwtService, Role};
use tracing::warn;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{Event, User},
    repositories::ReservationStore,
};

pub const INVALID_TOKEN: &str = "Invalid token.";

/// Authenticated identity of the current request
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub id: Uuid,
    pub role: Role,
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}

/// Strip the `Bearer ` scheme from an `Authorization` header value
pub fn bearer_token(header: Option<&str>) -> ApiResult<&str> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(INVALID_TOKEN.to_string()))
}

/// Verify a bearer token and return the user id it asserts
///
/// The expired/invalid distinction of the token service is kept in the
/// error message.
pub fn verify_token(jwt: &JwtService, token: &str) -> ApiResult<Uuid> {
    jwt.validate_token(token)
        .map(|claims| claims.sub)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))
}

/// Resolve the caller of a request that requires authentication
pub async fn authenticate(
    store: &dyn ReservationStore,
    jwt: &JwtService,
    header: Option<&str>,
) -> ApiResult<Caller> {
    let token = bearer_token(header)?;
    let user_id = verify_token(jwt, token)?;

    match store.find_user_by_id(user_id).await? {
        Some(user) => Ok(Caller::from(&user)),
        None => {
            warn!("Token for unknown user {} presented", user_id);
            Err(ApiError::Unauthorized(INVALID_TOKEN.to_string()))
        }
    }
}

/// Only Editors and Administrators may add rooms
pub fn require_room_manager(caller: &Caller) -> ApiResult<()> {
    if caller.role.can_manage_rooms() {
        return Ok(());
    }

    warn!("User {} ({}) tried to add a room", caller.id, caller.role);
    Err(ApiError::Forbidden(
        "Only Editor or Admin can add room".to_string(),
    ))
}

/// Only Administrators may change roles
pub fn require_admin(caller: &Caller) -> ApiResult<()> {
    if caller.role.is_admin() {
        return Ok(());
    }

    warn!("User {} ({}) tried to change a role", caller.id, caller.role);
    Err(ApiError::Forbidden(
        "Only administrator can change user role.".to_string(),
    ))
}

/// Only the owner of an event may manage its participants
pub fn require_event_owner(caller: &Caller, event: &Event) -> ApiResult<()> {
    if event.owner_id == Some(caller.id) {
        return Ok(());
    }

    warn!(
        "User {} tried to add participants to event {} owned by {:?}",
        caller.id, event.id, event.owner_id
    );
    Err(ApiError::Forbidden(
        "Only owner can add participants.".to_string(),
    ))
}
