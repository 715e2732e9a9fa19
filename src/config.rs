use anyhow::Context;
use serde::Deserialize;

/// Upper bound for `SESSION_TTL_MINUTES`: one year.
pub const MAX_SESSION_TTL_MINUTES: i64 = 60 * 24 * 365;
const DEFAULT_SESSION_TTL_MINUTES: i64 = 60 * 24 * 7;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://cineticket.db".into());
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET").context("SESSION_SECRET must be set")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "cineticket".into()),
            audience: std::env::var("SESSION_AUDIENCE")
                .unwrap_or_else(|_| "cineticket-web".into()),
            ttl_minutes: session_ttl_minutes(std::env::var("SESSION_TTL_MINUTES").ok())?,
            cookie_name: std::env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| "session".into()),
            cookie_secure: std::env::var("SESSION_COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };
        Ok(Self {
            database_url,
            max_connections,
            session,
        })
    }
}

fn session_ttl_minutes(raw: Option<String>) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_SESSION_TTL_MINUTES);
    };
    let minutes: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("SESSION_TTL_MINUTES is not a number: {raw:?}"))?;
    if !(1..=MAX_SESSION_TTL_MINUTES).contains(&minutes) {
        anyhow::bail!("SESSION_TTL_MINUTES must be between 1 and {MAX_SESSION_TTL_MINUTES}");
    }
    Ok(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ttl_defaults_to_a_week() {
        assert_eq!(session_ttl_minutes(None).unwrap(), 60 * 24 * 7);
        assert_eq!(session_ttl_minutes(Some(" 30 ".into())).unwrap(), 30);
    }

    #[test]
    fn session_ttl_out_of_range_is_rejected() {
        assert!(session_ttl_minutes(Some("0".into())).is_err());
        assert!(session_ttl_minutes(Some("-5".into())).is_err());
        assert!(session_ttl_minutes(Some(i64::MAX.to_string())).is_err());
        assert!(session_ttl_minutes(Some("soon".into())).is_err());
        assert!(session_ttl_minutes(Some(MAX_SESSION_TTL_MINUTES.to_string())).is_ok());
    }
}
