//! Authentication middleware for bearer token validation

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use crate::{
    error::{ApiError, ApiResult},
    policy,
    state::AppState,
};

/// Raw `Authorization` header value
///
/// `Ok(None)` only when the header is absent; a value that is not visible
/// ASCII is refused rather than treated as anonymous.
pub fn authorization_header(headers: &HeaderMap) -> ApiResult<Option<&str>> {
    headers
        .get(AUTHORIZATION)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| ApiError::Unauthorized(policy::INVALID_TOKEN.to_string()))
        })
        .transpose()
}

/// Authentication middleware
///
/// Resolves the bearer token to a [`policy::Caller`] and stores it in the
/// request extensions for the protected handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = policy::authenticate(
        state.store.as_ref(),
        &state.jwt_service,
        authorization_header(req.headers())?,
    )
    .await?;

    req.extensions_mut().insert(caller);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_absent_and_unreadable_headers_differ() {
        let mut headers = HeaderMap::new();
        assert_eq!(authorization_header(&headers).unwrap(), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(authorization_header(&headers).unwrap(), Some("Bearer abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_bytes(&[0xFF, 0xFE]).unwrap());
        let err = authorization_header(&headers).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }
}
