use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    /// Reload the user on every authenticated request and reject banned or deleted accounts.
    pub check_account_status: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    pub max_bytes: usize,
    pub link_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub images: ImageConfig,
    pub admin_seed: Option<AdminSeed>,
}

pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_LINK_TTL_SECS: u64 = 3600;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    parse_or(key, std::env::var(key).ok(), default)
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(v) => v.trim().parse::<T>().unwrap_or_else(|_| {
            warn!(key, value = %v, "unparseable value; using default");
            default
        }),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: env_or("JWT_ISSUER", "imagevault"),
            audience: env_or("JWT_AUDIENCE", "imagevault-users"),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60),
            check_account_status: env_parse("AUTH_CHECK_ACCOUNT_STATUS", false),
        };
        let storage = StorageConfig {
            endpoint: env_or("S3_ENDPOINT", "http://localhost:9000"),
            bucket: env_or("S3_BUCKET", "images"),
            access_key: env_or("S3_ACCESS_KEY", "minioadmin"),
            secret_key: env_or("S3_SECRET_KEY", "minioadmin"),
            region: env_or("S3_REGION", "us-east-1"),
        };
        let images = ImageConfig {
            max_bytes: env_parse("IMAGE_MAX_BYTES", DEFAULT_MAX_IMAGE_BYTES),
            link_ttl_secs: env_parse("IMAGE_LINK_TTL_SECS", DEFAULT_LINK_TTL_SECS),
        };
        let admin_seed = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminSeed { email, password }),
            _ => None,
        };
        Ok(Self {
            database_url,
            jwt,
            storage,
            images,
            admin_seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_falls_back_on_missing_or_bad_values() {
        assert_eq!(parse_or("JWT_TTL_MINUTES", None, 60i64), 60);
        assert_eq!(parse_or("JWT_TTL_MINUTES", Some(" 15 ".into()), 60i64), 15);
        assert_eq!(parse_or("JWT_TTL_MINUTES", Some("15m".into()), 60i64), 60);
        assert!(!parse_or("AUTH_CHECK_ACCOUNT_STATUS", Some("yes".into()), false));
    }
}
