//! Participant management

use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    policy::{self, Caller},
    repositories::ReservationStore,
};

/// Invite the user registered under `email` to an event owned by `caller`
///
/// Ownership is checked before the email.
pub async fn add_participant(
    store: &dyn ReservationStore,
    caller: &Caller,
    event_id: Uuid,
    email: Option<&str>,
) -> ApiResult<()> {
    let event = store
        .find_event(event_id)
        .await?
        .ok_or(ApiError::EventNotFound)?;
    policy::require_event_owner(caller, &event)?;

    let email = email
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .ok_or_else(|| ApiError::Validation("Email must be provided".to_string()))?;

    let user = store.find_user_by_email(email).await?.ok_or_else(|| {
        ApiError::UserNotFound("User with provided email doesnt exist.".to_string())
    })?;

    if !store.add_participant(event_id, user.id).await? {
        return Err(ApiError::AlreadyParticipant);
    }

    info!("User {} added to event {}", user.id, event_id);
    Ok(())
}
