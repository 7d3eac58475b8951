use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

use crate::validators::megabytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

/// Secret used to sign tokens when none is configured in development.
const DEV_JWT_SECRET: &str = "petstagram-dev-secret";

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // Database (in-memory store when unset)
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // Tokens
    pub jwt_secret: String,
    pub jwt_ttl_seconds: u64,

    // Uploaded photos
    pub media_root: PathBuf,
    pub photo_max_size_mb: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        // Database
        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.trim().is_empty());
        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Tokens
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if env.is_dev() => DEV_JWT_SECRET.to_string(),
            _ => bail!("JWT_SECRET must be set outside the dev environment"),
        };
        let jwt_ttl_seconds = env::var("JWT_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400); // 1 day

        // Uploaded photos
        let media_root = PathBuf::from(env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string()));
        let photo_max_size_mb = match env::var("PHOTO_MAX_SIZE_MB") {
            Ok(raw) => parse_photo_max_size_mb(&raw)?,
            Err(_) => 5,
        };

        Ok(Settings {
            env,
            server_addr,
            database_url,
            database_max_connections,
            cors_allow_origins,
            jwt_secret,
            jwt_ttl_seconds,
            media_root,
            photo_max_size_mb,
        })
    }

    /// Upload limit in bytes for a single photo.
    pub fn photo_max_bytes(&self) -> u64 {
        megabytes(self.photo_max_size_mb)
    }
}

/// Parses `PHOTO_MAX_SIZE_MB`; the limit must fit in bytes on this platform.
fn parse_photo_max_size_mb(raw: &str) -> Result<u64> {
    let mb: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("PHOTO_MAX_SIZE_MB is not a number: {raw}"))?;
    let fits = mb
        .checked_mul(1024 * 1024)
        .and_then(|bytes| usize::try_from(bytes).ok())
        .is_some();
    if !fits {
        bail!("PHOTO_MAX_SIZE_MB is too large: {mb}");
    }
    Ok(mb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parsing_defaults_to_dev() {
        assert_eq!(Environment::from_str("PRODUCTION"), Environment::Prod);
        assert_eq!(Environment::from_str("staging"), Environment::Staging);
        assert_eq!(Environment::from_str("anything"), Environment::Dev);
        assert!(Environment::Dev.is_dev());
        assert!(!Environment::Staging.is_prod());
    }

    #[test]
    fn photo_limit_must_fit_in_bytes() {
        assert_eq!(parse_photo_max_size_mb(" 5 ").unwrap(), 5);
        assert!(parse_photo_max_size_mb("five").is_err());
        assert!(parse_photo_max_size_mb(&u64::MAX.to_string()).is_err());
        assert!(parse_photo_max_size_mb(&(u64::MAX / 1024).to_string()).is_err());
    }
}
