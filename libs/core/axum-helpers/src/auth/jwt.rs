use super::config::JwtConfig;
use super::{OrgRole, Principal};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid JWKS document: {0}")]
    InvalidJwks(String),

    #[error("Token rejected: {0}")]
    InvalidToken(String),

    #[error("Token signed with unknown key '{0}'")]
    UnknownKey(String),
}

/// JWT claims carried by every access token.
///
/// `org_id` is a single organization, never a list; switching organizations
/// requires re-authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub org_id: Uuid,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// RS256 token verifier backed by a JWKS document.
///
/// Keys are resolved by `kid`; when the token header carries no `kid` the
/// first key in the set is used.
pub struct JwtVerifier {
    keys: HashMap<String, DecodingKey>,
    first_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn from_config(config: &JwtConfig) -> Result<Self, AuthError> {
        let jwks: JwkSet = serde_json::from_str(&config.jwks_json)
            .map_err(|e| AuthError::InvalidJwks(e.to_string()))?;

        let mut keys = HashMap::new();
        let mut first_key = None;
        for jwk in &jwks.keys {
            let key = DecodingKey::from_jwk(jwk)
                .map_err(|e| AuthError::InvalidJwks(e.to_string()))?;
            if first_key.is_none() {
                first_key = Some(key.clone());
            }
            if let Some(kid) = &jwk.common.key_id {
                keys.insert(kid.clone(), key);
            }
        }
        let first_key =
            first_key.ok_or_else(|| AuthError::InvalidJwks("JWKS holds no keys".to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[config.issuer.clone()]);
        validation.set_audience(&[config.audience.clone()]);

        tracing::info!(keys = keys.len(), "JWT verifier initialized");
        Ok(Self {
            keys,
            first_key,
            validation,
        })
    }

    /// Verify signature, expiry, issuer and audience; decode the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let key = match header.kid {
            Some(kid) => self
                .keys
                .get(&kid)
                .ok_or(AuthError::UnknownKey(kid))?,
            None => &self.first_key,
        };

        let data = decode::<Claims>(token, key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        Ok(data.claims)
    }

    /// Verify a token and build the request principal from its claims.
    pub fn principal(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.verify(token)?;
        let role = OrgRole::from_str(&claims.role)
            .map_err(|_| AuthError::InvalidToken(format!("unknown role '{}'", claims.role)))?;

        Ok(Principal {
            user_id: claims.sub,
            organization_id: claims.org_id,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_jwks() {
        let config = JwtConfig {
            jwks_json: "not json".to_string(),
            issuer: "iss".to_string(),
            audience: "aud".to_string(),
        };
        assert!(matches!(
            JwtVerifier::from_config(&config),
            Err(AuthError::InvalidJwks(_))
        ));
    }

    #[test]
    fn test_rejects_empty_jwks() {
        let config = JwtConfig {
            jwks_json: r#"{"keys": []}"#.to_string(),
            issuer: "iss".to_string(),
            audience: "aud".to_string(),
        };
        assert!(matches!(
            JwtVerifier::from_config(&config),
            Err(AuthError::InvalidJwks(_))
        ));
    }
}
