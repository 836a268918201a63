//! Account operations: registration, login, role changes and the
//! administrator bootstrap

use auth::{JwtService, Role, password, validation};
use common::error::DatabaseError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{LoginRequest, NewUser, RegisterRequest, TokenResponse},
    policy::{self, Caller},
    repositories::ReservationStore,
};

/// Create a Guest account and log it in
pub async fn register(
    store: &dyn ReservationStore,
    jwt: &JwtService,
    request: RegisterRequest,
) -> ApiResult<TokenResponse> {
    let (Some(email), Some(first_name), Some(last_name), Some(plain)) = (
        request.email,
        request.first_name,
        request.last_name,
        request.password,
    ) else {
        return Err(ApiError::Validation(
            "All variables must be provided".to_string(),
        ));
    };

    validation::validate_password(&plain).map_err(ApiError::Validation)?;
    validation::validate_email(&email).map_err(ApiError::Validation)?;

    let duplicate = || ApiError::Validation("User with provided email already exist.".to_string());

    if store.find_user_by_email(&email).await?.is_some() {
        return Err(duplicate());
    }

    // Races past this lookup surface as UniqueViolation
    let user = match store
        .insert_user(NewUser {
            email,
            first_name: Some(first_name),
            last_name: Some(last_name),
            password_hash: password::hash_password(&plain)?,
            role: Role::Guest,
        })
        .await
    {
        Ok(user) => user,
        Err(DatabaseError::UniqueViolation(_)) => return Err(duplicate()),
        Err(e) => return Err(e.into()),
    };

    info!("Registered user {}", user.id);

    Ok(TokenResponse {
        token: jwt.generate_token(user.id)?,
    })
}

/// Exchange email and password for a bearer token
pub async fn login(
    store: &dyn ReservationStore,
    jwt: &JwtService,
    request: LoginRequest,
) -> ApiResult<TokenResponse> {
    let invalid = || ApiError::BadRequest("Invalid email and password.".to_string());

    let user = store
        .find_user_by_email(&request.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&request.password, &user.password_hash)? {
        warn!("Failed login for user {}", user.id);
        return Err(invalid());
    }

    Ok(TokenResponse {
        token: jwt.generate_token(user.id)?,
    })
}

/// Administrator-only change of another account's role
pub async fn change_role(
    store: &dyn ReservationStore,
    caller: &Caller,
    user_id: Uuid,
    role_id: i64,
) -> ApiResult<Role> {
    policy::require_admin(caller)?;

    if store.find_user_by_id(user_id).await?.is_none() {
        return Err(ApiError::UserNotFound("Invalid userId.".to_string()));
    }

    let role = Role::try_from(role_id).map_err(|e| ApiError::Validation(e.to_string()))?;
    if !store.update_user_role(user_id, role).await? {
        return Err(ApiError::UserNotFound("Invalid userId.".to_string()));
    }

    info!("User {} changed role of {} to {}", caller.id, user_id, role);
    Ok(role)
}

/// Make sure an Administrator account exists under `email`
///
/// Returns `true` when the account had to be created.
pub async fn bootstrap_admin(
    store: &dyn ReservationStore,
    email: &str,
    plain_password: &str,
) -> ApiResult<bool> {
    if store.find_user_by_email(email).await?.is_some() {
        return Ok(false);
    }

    let admin = match store
        .insert_user(NewUser {
            email: email.to_string(),
            first_name: None,
            last_name: None,
            password_hash: password::hash_password(plain_password)?,
            role: Role::Administrator,
        })
        .await
    {
        Ok(admin) => admin,
        Err(DatabaseError::UniqueViolation(_)) => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    info!("Created administrator account {}", admin.id);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryStore;
    use auth::JwtConfig;

    fn jwt() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "account-tests".to_string(),
            token_expiry: 60,
        })
    }

    fn registration(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: Some(email.to_string()),
            first_name: Some("Grace".to_string()),
            last_name: Some("Hopper".to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn test_registration_rules() {
        let store = MemoryStore::new();
        let jwt = jwt();

        let err = register(&store, &jwt, registration("test@test", "secret"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid email.");

        let err = register(&store, &jwt, registration("test@test.com", "12345"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Password cannot be shorter than 6 characters");

        let err = register(&store, &jwt, RegisterRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "All variables must be provided");

        let response = register(&store, &jwt, registration("test@test.com", "123456"))
            .await
            .unwrap();
        let user_id = jwt.validate_token(&response.token).unwrap().sub;
        let user = store.find_user_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(user.role, Role::Guest);
        assert_ne!(user.password_hash, "123456");

        let err = register(&store, &jwt, registration("test@test.com", "123456"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User with provided email already exist.");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_create_one_account() {
        let store = MemoryStore::new();
        let jwt = jwt();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let jwt = jwt.clone();
                tokio::spawn(async move {
                    register(&store, &jwt, registration("dup@test.com", "123456")).await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => {
                    assert_eq!(err.to_string(), "User with provided email already exist.")
                }
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_login_checks_password() {
        let store = MemoryStore::new();
        let jwt = jwt();
        register(&store, &jwt, registration("login@test.com", "hunter22"))
            .await
            .unwrap();

        let ok = login(
            &store,
            &jwt,
            LoginRequest {
                email: "login@test.com".to_string(),
                password: "hunter22".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(jwt.validate_token(&ok.token).is_ok());

        for (email, password) in [("login@test.com", "wrong!!"), ("nobody@test.com", "hunter22")] {
            let err = login(
                &store,
                &jwt,
                LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                },
            )
            .await
            .unwrap_err();
            assert_eq!(err.to_string(), "Invalid email and password.");
        }
    }

    #[tokio::test]
    async fn test_role_change_is_admin_only() {
        let store = MemoryStore::new();
        assert!(bootstrap_admin(&store, "admin@test.com", "admin1").await.unwrap());
        assert!(!bootstrap_admin(&store, "admin@test.com", "admin1").await.unwrap());

        let admin = store
            .find_user_by_email("admin@test.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Administrator);
        let admin = Caller::from(&admin);

        let jwt = jwt();
        let token = register(&store, &jwt, registration("user@test.com", "123456"))
            .await
            .unwrap()
            .token;
        let user_id = jwt.validate_token(&token).unwrap().sub;
        let user = Caller {
            id: user_id,
            role: Role::Guest,
        };

        let err = change_role(&store, &user, admin.id, 1).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = change_role(&store, &admin, user_id, 7).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid roleId value");

        let err = change_role(&store, &admin, Uuid::new_v4(), 2).await.unwrap_err();
        assert!(matches!(err, ApiError::UserNotFound(_)));

        assert_eq!(change_role(&store, &admin, user_id, 2).await.unwrap(), Role::Editor);
        let user = store.find_user_by_id(user_id).await.unwrap().unwrap();
        assert_eq!(user.role, Role::Editor);
    }
}
