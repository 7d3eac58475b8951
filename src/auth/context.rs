use super::Claims;
use uuid::Uuid;

/// Identity of the caller, extracted from a verified token.
/// Handlers receive it explicitly instead of looking up a global profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    /// Profile the request acts on behalf of (from the `sub` claim)
    pub profile_id: Uuid,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Result<Self, &'static str> {
        let profile_id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid profile ID in token")?;
        Ok(Self { profile_id })
    }
}
