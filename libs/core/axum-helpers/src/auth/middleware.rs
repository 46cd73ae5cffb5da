use super::jwt::JwtVerifier;
use super::Principal;
use crate::errors::AppError;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// Extract the bearer token from the Authorization header
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
}

/// JWT authentication middleware.
///
/// Validates the bearer token and inserts a [`Principal`] into request
/// extensions on success. Missing, malformed, or expired tokens fail with
/// `Unauthorized`.
pub async fn auth_middleware(
    State(verifier): State<Arc<JwtVerifier>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer(&headers)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

    let principal = verifier.principal(token).map_err(|e| {
        tracing::debug!("token verification failed: {}", e);
        AppError::Unauthorized("invalid or expired token".to_string())
    })?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Cross-check a path organization id against the token's.
///
/// The path may carry the organization for routing, but the token is the
/// source of truth; a mismatch is a scoping violation, not a routing miss.
pub fn require_org(principal: &Principal, path_org_id: Uuid) -> Result<(), AppError> {
    if principal.organization_id != path_org_id {
        return Err(AppError::Forbidden(format!(
            "token is not scoped to organization {}",
            path_org_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::OrgRole;
    use axum::http::HeaderValue;

    fn principal(org: Uuid) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            organization_id: org,
            role: OrgRole::Member,
        }
    }

    #[test]
    fn test_extract_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extract_bearer_missing_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic xyz"));
        assert_eq!(extract_bearer(&headers), None);
    }

    #[test]
    fn test_require_org_match() {
        let org = Uuid::new_v4();
        assert!(require_org(&principal(org), org).is_ok());
    }

    #[test]
    fn test_require_org_mismatch_is_forbidden() {
        let result = require_org(&principal(Uuid::new_v4()), Uuid::new_v4());
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
