use std::fmt;
use std::time::Duration;

use auth::{JwtConfig, DEFAULT_EXPIRES_IN_SECS, DEFAULT_STORE_TIMEOUT};
use db::DbConfig;
use error::AppError;

/// Longest accepted token lifetime: one year.
pub const MAX_EXPIRE_MINUTES: i64 = 365 * 24 * 60;

/// Longest accepted store lookup timeout.
pub const MAX_STORE_TIMEOUT_SECS: u64 = 300;

/// School service configuration
#[derive(Clone)]
pub struct ServiceConfig {
    /// HTTP listen address
    pub http_addr: String,

    /// Token signing and lifetime settings
    pub jwt: JwtConfig,

    /// Upper bound for a single user store lookup, in seconds
    pub store_timeout_secs: u64,

    /// Serve from an in-memory user store instead of MySQL
    pub use_in_memory_store: bool,

    /// MySQL settings, unused with the in-memory store
    pub db: DbConfig,

    /// Admin login seeded into the in-memory store
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,

    /// Service version
    pub version: String,
}

impl ServiceConfig {
    /// Defaults for everything except the signing secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            http_addr: "0.0.0.0:8000".to_string(),
            jwt: JwtConfig::new(secret, "school-service", DEFAULT_EXPIRES_IN_SECS),
            store_timeout_secs: DEFAULT_STORE_TIMEOUT.as_secs(),
            use_in_memory_store: false,
            db: DbConfig::default(),
            admin_username: None,
            admin_password: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Create configuration from environment variables. `SECRET_KEY` is
    /// required.
    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("SECRET_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Config("SECRET_KEY is not set".to_string()))?;

        let mut config = Self::new(secret);
        config.db = DbConfig::from_env();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            config.http_addr = addr;
        }

        if let Ok(issuer) = std::env::var("TOKEN_ISSUER") {
            config.jwt.issuer = issuer;
        }

        if let Ok(minutes) = std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES") {
            config.jwt.expires_in_secs = parse_expire_minutes(&minutes)?;
        }

        if let Ok(timeout) = std::env::var("STORE_TIMEOUT_SECS") {
            config.store_timeout_secs = parse_store_timeout(&timeout)?;
        }

        if let Ok(in_memory) = std::env::var("USE_IN_MEMORY_STORE") {
            config.use_in_memory_store = in_memory.to_lowercase() == "true" || in_memory == "1";
        }

        config.admin_username = std::env::var("ADMIN_USERNAME").ok();
        config.admin_password = std::env::var("ADMIN_PASSWORD").ok();

        Ok(config)
    }

    /// Get store timeout as Duration
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

/// Token lifetime in seconds from a minute count in `1..=MAX_EXPIRE_MINUTES`.
fn parse_expire_minutes(value: &str) -> Result<i64, AppError> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|n| (1..=MAX_EXPIRE_MINUTES).contains(n))
        .and_then(|n| n.checked_mul(60))
        .ok_or_else(|| {
            AppError::Config(format!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be an integer in 1..={MAX_EXPIRE_MINUTES}, got '{value}'"
            ))
        })
}

/// Store timeout in seconds, `1..=MAX_STORE_TIMEOUT_SECS`.
fn parse_store_timeout(value: &str) -> Result<u64, AppError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|n| (1..=MAX_STORE_TIMEOUT_SECS).contains(n))
        .ok_or_else(|| {
            AppError::Config(format!(
                "STORE_TIMEOUT_SECS must be an integer in 1..={MAX_STORE_TIMEOUT_SECS}, got '{value}'"
            ))
        })
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("http_addr", &self.http_addr)
            .field("jwt", &self.jwt)
            .field("store_timeout_secs", &self.store_timeout_secs)
            .field("use_in_memory_store", &self.use_in_memory_store)
            .field("db", &self.db)
            .field("admin_username", &self.admin_username)
            .field("admin_password", &self.admin_password.as_ref().map(|_| "<redacted>"))
            .field("version", &self.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::new("secret");
        assert_eq!(config.http_addr, "0.0.0.0:8000");
        assert_eq!(config.jwt.expires_in_secs, 30 * 60);
        assert_eq!(config.jwt.issuer, "school-service");
        assert_eq!(config.store_timeout(), Duration::from_secs(5));
        assert!(!config.use_in_memory_store);
        assert!(config.admin_username.is_none());
    }

    #[test]
    fn test_debug_hides_admin_password() {
        let mut config = ServiceConfig::new("secret");
        config.admin_password = Some("hunter2".to_string());
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_expire_minutes() {
        assert_eq!(parse_expire_minutes("30").unwrap(), 1800);
        assert_eq!(
            parse_expire_minutes(&MAX_EXPIRE_MINUTES.to_string()).unwrap(),
            MAX_EXPIRE_MINUTES * 60
        );
        for bad in ["0", "-5", "soon", "", "153722867280912931", "9223372036854775807"] {
            assert!(
                matches!(parse_expire_minutes(bad), Err(AppError::Config(_))),
                "accepted '{bad}'"
            );
        }
    }

    #[test]
    fn test_store_timeout() {
        assert_eq!(parse_store_timeout("5").unwrap(), 5);
        for bad in ["0", "-1", "five", "301"] {
            assert!(
                matches!(parse_store_timeout(bad), Err(AppError::Config(_))),
                "accepted '{bad}'"
            );
        }
    }
}
