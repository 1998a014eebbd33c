use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ShopError;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub jti: Uuid,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> { self.sub.parse().ok() }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp as i64, 0).single().unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken { pub access: String, pub jti: Uuid, pub expires_at: DateTime<Utc> }

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }

    pub fn issue(&self, user_id: i64) -> Result<IssuedToken, ShopError> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        let access = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ShopError::Internal(format!("token encoding failed: {e}")))?;
        Ok(IssuedToken { access, jti: claims.jti, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ShopError> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                ShopError::Unauthorized("Given token not valid for any token type".into())
            })
    }
}

/// Extracts the token from `Authorization: JWT <token>` (or `Bearer <token>`).
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    if (scheme == "JWT" || scheme.eq_ignore_ascii_case("bearer")) && !token.is_empty() { Some(token) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_verify() {
        let svc = TokenService::new("test-secret", 24);
        let issued = svc.issue(42).unwrap();
        let claims = svc.verify(&issued.access).unwrap();
        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.expires_at().timestamp(), issued.expires_at.timestamp());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let issued = TokenService::new("one", 24).issue(1).unwrap();
        let err = TokenService::new("two", 24).verify(&issued.access).unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = TokenService::new("test-secret", -2);
        let issued = svc.issue(1).unwrap();
        assert!(svc.verify(&issued.access).is_err());
    }

    #[test]
    fn authorization_schemes() {
        assert_eq!(parse_authorization("JWT abc.def"), Some("abc.def"));
        assert_eq!(parse_authorization("Bearer abc.def"), Some("abc.def"));
        assert_eq!(parse_authorization("Basic abc"), None);
        assert_eq!(parse_authorization("JWT "), None);
        assert_eq!(parse_authorization("abc.def"), None);
    }
}
