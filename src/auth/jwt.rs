//! HS256 bearer token verification.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::{Authenticator, Identity};
use crate::config::AuthConfig;
use crate::error::{GatewayError, Result};

/// Claims the gateway reads from a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Expiry, seconds since epoch.
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Verifies tokens signed with a shared secret.
#[derive(Clone)]
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_secs;
        match &config.issuer {
            Some(issuer) => {
                validation.set_required_spec_claims(&["exp", "sub", "iss"]);
                validation.set_issuer(&[issuer]);
            }
            None => validation.set_required_spec_claims(&["exp", "sub"]),
        }

        Self {
            key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, token: &str) -> Result<Identity> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Bearer token rejected");
            GatewayError::unauthenticated("invalid or expired token")
        })?;

        if data.claims.sub.is_empty() {
            return Err(GatewayError::unauthenticated("token has no subject"));
        }

        Ok(Identity {
            user_id: data.claims.sub,
            username: data.claims.username,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn now() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
    }

    fn token(secret: &str, claims: &Claims) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.into(),
            issuer: None,
            leeway_secs: 0,
        }
    }

    fn claims(exp: u64) -> Claims {
        Claims {
            sub: "u-1".into(),
            username: Some("alice".into()),
            exp,
            iss: None,
        }
    }

    #[test]
    fn test_valid_token() {
        let auth = JwtAuthenticator::new(&config("secret"));
        let identity = auth.authenticate(&token("secret", &claims(now() + 600))).unwrap();
        assert_eq!(identity.user_id, "u-1");
        assert_eq!(identity.username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_rejections() {
        let auth = JwtAuthenticator::new(&config("secret"));
        assert!(auth.authenticate(&token("other", &claims(now() + 600))).is_err());
        assert!(auth.authenticate(&token("secret", &claims(now() - 600))).is_err());
        assert!(matches!(auth.authenticate("garbage"), Err(GatewayError::Unauthenticated(_))));
    }

    #[test]
    fn test_issuer_enforced() {
        let mut cfg = config("secret");
        cfg.issuer = Some("sso".into());
        let auth = JwtAuthenticator::new(&cfg);

        assert!(auth.authenticate(&token("secret", &claims(now() + 600))).is_err());

        let mut with_iss = claims(now() + 600);
        with_iss.iss = Some("sso".into());
        assert!(auth.authenticate(&token("secret", &with_iss)).is_ok());
    }
}
