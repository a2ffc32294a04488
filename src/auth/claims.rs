use serde::{Deserialize, Serialize};

/// JWT payload used for authentication.
///
/// The subject is the store-assigned user id, carried opaquely. Tokens are
/// stateless and cannot be revoked before expiry; the TTL is the only
/// revocation control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user ID
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
}
