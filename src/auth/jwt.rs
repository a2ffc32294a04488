use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::auth::claims::Claims;
use crate::config::JwtConfig;
use crate::state::AppState;

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: TimeDuration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: TimeDuration::minutes(ttl_minutes),
        }
    }
}

impl JwtKeys {
    fn sign_with_ttl(&self, user_id: &str, ttl: TimeDuration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + ttl;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(%user_id, "jwt signed");
        Ok(token)
    }

    pub fn sign(&self, user_id: &str) -> anyhow::Result<String> {
        self.sign_with_ttl(user_id, self.ttl)
    }

    /// Signature and expiry check. Malformed and expired tokens both collapse
    /// into one invalid outcome; expiry has zero leeway.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: TimeDuration::minutes(30),
        }
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys("dev-secret");
        let token = keys.sign("u-123").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "u-123");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys("dev-secret");
        let token = keys
            .sign_with_ttl("u-123", TimeDuration::seconds(-30))
            .expect("sign");
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn token_within_ttl_is_accepted() {
        let keys = make_keys("dev-secret");
        let token = keys
            .sign_with_ttl("u-123", TimeDuration::seconds(60))
            .expect("sign");
        assert!(keys.verify(&token).is_ok());
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token = make_keys("secret-a").sign("u-123").expect("sign");
        assert!(make_keys("secret-b").verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_tampered_token() {
        let keys = make_keys("dev-secret");
        let mut token = keys.sign("u-123").expect("sign");
        token.push('x');
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = make_keys("dev-secret");
        assert!(keys.verify("not-a-jwt").is_err());
    }
}
