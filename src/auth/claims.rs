use serde::{Deserialize, Serialize};

/// Issuer written into every token this service signs.
pub const ISSUER: &str = "petstagram";

/// JWT claims for profile session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (profile ID)
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}
