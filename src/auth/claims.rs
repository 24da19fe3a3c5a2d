use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT payload carried by a sign-in link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkClaims {
    pub sub: String, // email the link was issued for
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub jti: Uuid,   // link id
}
