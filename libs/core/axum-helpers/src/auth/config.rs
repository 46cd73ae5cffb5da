use core_config::{env_or_default, env_required, ConfigError, FromEnv};

/// JWT verification configuration.
///
/// The JWKS document is provided inline (`AUTH_JWKS`) or as a file path
/// (`AUTH_JWKS_PATH`); inline wins when both are set. Issuer and audience
/// are always enforced.
#[derive(Clone, Debug)]
pub struct JwtConfig {
    /// JWKS document (JSON) holding the RS256 public keys
    pub jwks_json: String,
    pub issuer: String,
    pub audience: String,
}

impl FromEnv for JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let jwks_json = match std::env::var("AUTH_JWKS") {
            Ok(inline) => inline,
            Err(_) => {
                let path = env_required("AUTH_JWKS_PATH")?;
                std::fs::read_to_string(&path).map_err(|e| ConfigError::Invalid {
                    key: "AUTH_JWKS_PATH".to_string(),
                    value: path.clone(),
                    expected: format!("a readable JWKS file ({})", e),
                })?
            }
        };

        Ok(Self {
            jwks_json,
            issuer: env_or_default("AUTH_ISSUER", "https://auth.hexabase.ai"),
            audience: env_or_default("AUTH_AUDIENCE", "hexabase-api"),
        })
    }
}
