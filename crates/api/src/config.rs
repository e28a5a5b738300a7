//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use anyhow::Context;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// `None` ⇒ in-memory stores.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// Prefix of the accept/decline links sent with invitations.
    pub app_base_url: String,
    pub bootstrap_admin_password: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            database_url: None,
            database_max_connections: 10,
            app_base_url: "http://localhost:5173".to_string(),
            bootstrap_admin_password: "admin123".to_string(),
        }
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset and blank values fall back
    /// to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Settings::default();

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("BIND_ADDR is not a socket address: {raw}"))?,
            None => defaults.bind_addr,
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            defaults.jwt_secret
        });

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS is not a number: {raw}"))?,
            None => defaults.database_max_connections,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            database_url: get("DATABASE_URL"),
            database_max_connections,
            app_base_url: get("APP_BASE_URL").unwrap_or(defaults.app_base_url),
            bootstrap_admin_password: get("BOOTSTRAP_ADMIN_PASSWORD").unwrap_or(defaults.bootstrap_admin_password),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn values_override_defaults() {
        let settings = Settings::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("JWT_SECRET", "prod"),
            ("DATABASE_URL", "postgres://localhost/fieldgate"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("APP_BASE_URL", "https://admin.example.com"),
        ]))
        .unwrap();
        assert_eq!(settings.bind_addr.port(), 9000);
        assert_eq!(settings.jwt_secret, "prod");
        assert_eq!(settings.database_url.as_deref(), Some("postgres://localhost/fieldgate"));
        assert_eq!(settings.database_max_connections, 4);
        assert_eq!(settings.app_base_url, "https://admin.example.com");
        assert_eq!(settings.bootstrap_admin_password, "admin123");
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(Settings::from_lookup(lookup(&[("BIND_ADDR", "nope")])).is_err());
        assert!(Settings::from_lookup(lookup(&[("DATABASE_MAX_CONNECTIONS", "ten")])).is_err());
    }
}
