//! Server configuration.

use std::env;

/// Origins allowed when `CORS_ORIGINS` is not set.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "https://asali-frontend.vercel.app",
    "https://asali-frontend-*.vercel.app",
];

/// Supabase Storage settings used for product images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub url: String,
    /// Anonymous API key.
    pub anon_key: String,
    /// Storage bucket holding product images.
    pub bucket: String,
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// PostgreSQL URL. The in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    pub database_max_connections: u32,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// JWT expiration in hours.
    pub jwt_expiration_hours: u64,
    /// Image storage. Uploads are skipped when absent.
    pub supabase: Option<SupabaseConfig>,
    /// Allowed CORS origins. Entries may contain `*` wildcards.
    pub cors_origins: Vec<String>,
    /// Deployment environment name.
    pub environment: String,
    /// Log level.
    pub log_level: String,
}

impl Config {
    /// Creates a configuration with default settings and the given secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_url: None,
            database_max_connections: 5,
            jwt_secret: jwt_secret.into(),
            jwt_expiration_hours: auth::DEFAULT_JWT_EXPIRATION_HOURS,
            supabase: None,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            environment: "development".to_string(),
            log_level: "info".to_string(),
        }
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET is required"))?;
        let mut config = Self::new(jwt_secret);

        if let Some(host) = var("HOST") {
            config.host = host;
        }
        if let Some(port) = var("PORT") {
            config.port = port
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a port number, got '{port}'"))?;
        }
        config.database_url = var("DATABASE_URL");
        if let Some(max) = var("DATABASE_MAX_CONNECTIONS") {
            config.database_max_connections = max.parse().unwrap_or(5);
        }
        if let Some(hours) = var("JWT_EXPIRATION_HOURS") {
            config.jwt_expiration_hours = hours
                .parse()
                .unwrap_or(auth::DEFAULT_JWT_EXPIRATION_HOURS);
        }

        if let (Some(url), Some(anon_key)) = (var("SUPABASE_URL"), var("SUPABASE_ANON_KEY")) {
            config.supabase = Some(SupabaseConfig {
                url: url.trim_end_matches('/').to_string(),
                anon_key,
                bucket: var("SUPABASE_BUCKET").unwrap_or_else(|| "products".to_string()),
            });
        }

        if let Some(origins) = var("CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(environment) = var("APP_ENV") {
            config.environment = environment;
        }
        if let Some(level) = var("LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Returns the server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_jwt_secret_is_required() {
        assert!(load(&[]).is_err());
        assert!(load(&[("JWT_SECRET", "  ")]).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("JWT_SECRET", "s3cret")]).unwrap();

        assert_eq!(config.server_addr(), "0.0.0.0:5000");
        assert_eq!(config.jwt_expiration_hours, 168);
        assert_eq!(config.database_url, None);
        assert_eq!(config.supabase, None);
        assert_eq!(config.cors_origins.len(), DEFAULT_CORS_ORIGINS.len());
        assert_eq!(config.environment, "development");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("JWT_SECRET", "s3cret"),
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/asali"),
            ("SUPABASE_URL", "https://abc.supabase.co/"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("CORS_ORIGINS", "https://shop.example.com, https://*.example.com,"),
            ("APP_ENV", "production"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/asali"));
        let supabase = config.supabase.unwrap();
        assert_eq!(supabase.url, "https://abc.supabase.co");
        assert_eq!(supabase.bucket, "products");
        assert_eq!(
            config.cors_origins,
            vec!["https://shop.example.com", "https://*.example.com"]
        );
        assert_eq!(config.environment, "production");
    }

    #[test]
    fn test_invalid_port() {
        assert!(load(&[("JWT_SECRET", "s3cret"), ("PORT", "http")]).is_err());
    }
}
