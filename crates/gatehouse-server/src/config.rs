use chrono::Duration;
use gatehouse_auth::{JwtAlgorithm, JwtConfig, OAuthProvider, ProviderDescriptor};
use gatehouse_identity::EmailConflictPolicy;
use std::env;

/// Where users are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    /// Process-local in-memory store
    Memory,
    /// SQLite database file
    Sqlite(String),
}

impl DatabaseTarget {
    fn parse(url: &str) -> Self {
        match url.trim() {
            "" | "memory" | ":memory:" => DatabaseTarget::Memory,
            other => DatabaseTarget::Sqlite(other.to_string()),
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host (default: 0.0.0.0)
    pub host: String,
    /// Bind port (default: 3000)
    pub port: u16,
    /// Session token settings
    pub jwt: JwtConfig,
    /// User store
    pub database: DatabaseTarget,
    /// Public base URL that provider callbacks are registered under
    pub callback_base: String,
    /// Enabled login providers
    pub providers: Vec<ProviderDescriptor>,
    /// Handling of a first login whose email is already taken
    pub email_policy: EmailConflictPolicy,
    /// Log level used when RUST_LOG is unset (default: info)
    pub log_level: String,
}

impl ServerConfig {
    /// Load configuration from the process environment, reading `.env`
    /// first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match var("PORT") {
            Some(p) => p.trim().parse().map_err(|_| ConfigError::InvalidPort)?,
            None => 3000,
        };

        let mut jwt = JwtConfig::new(var("JWT_SECRET").ok_or(ConfigError::MissingEnvVar("JWT_SECRET"))?);
        if let Some(ttl) = var("JWT_TTL_SECS") {
            let secs: i64 = ttl
                .trim()
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or(ConfigError::InvalidValue("JWT_TTL_SECS", ttl.clone()))?;
            jwt.token_ttl = Duration::seconds(secs);
        }
        if let Some(issuer) = var("JWT_ISSUER") {
            jwt.issuer = issuer;
        }
        if let Some(alg) = var("JWT_ALGORITHM") {
            jwt.algorithm =
                JwtAlgorithm::parse(&alg).ok_or(ConfigError::InvalidValue("JWT_ALGORITHM", alg))?;
        }

        let database = DatabaseTarget::parse(&var("DATABASE_URL").unwrap_or_default());

        let callback_base = var("CALLBACK_URL").unwrap_or_else(|| format!("http://localhost:{}", port));

        let mut providers = Vec::new();
        for (provider, id_key, secret_key) in [
            (OAuthProvider::Google, "GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"),
            (OAuthProvider::GitHub, "GITHUB_CLIENT_ID", "GITHUB_CLIENT_SECRET"),
        ] {
            if let (Some(id), Some(secret)) = (var(id_key), var(secret_key)) {
                providers.push(ProviderDescriptor::new(provider, id, secret, &callback_base));
            }
        }

        let email_policy = match var("EMAIL_CONFLICT_POLICY") {
            Some(p) => EmailConflictPolicy::parse(&p)
                .ok_or(ConfigError::InvalidValue("EMAIL_CONFLICT_POLICY", p))?,
            None => EmailConflictPolicy::Reject,
        };

        Ok(ServerConfig {
            host,
            port,
            jwt,
            database,
            callback_base,
            providers,
            email_policy,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Address to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),
    #[error("Invalid port number")]
    InvalidPort,
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
