use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub export: ExportConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        let database = DatabaseConfig {
            url: non_empty_var("DATABASE_URL"),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5)?,
            snapshot_path: non_empty_var("APP_DIRECTORY_SNAPSHOT").map(PathBuf::from),
        };

        let supabase = match (
            non_empty_var("SUPABASE_URL"),
            non_empty_var("SUPABASE_SERVICE_KEY"),
        ) {
            (Some(url), Some(service_key)) => Some(SupabaseConfig { url, service_key }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteSupabase),
        };

        let storage = StorageConfig {
            bucket: env::var("APP_EXPORT_BUCKET").unwrap_or_else(|_| "coach-exports".to_string()),
            local_dir: PathBuf::from(
                env::var("APP_EXPORT_DIR").unwrap_or_else(|_| "./exports".to_string()),
            ),
            supabase,
        };

        let export = ExportConfig {
            signed_url_ttl_secs: parse_var("APP_EXPORT_URL_TTL_SECS", 7 * 24 * 60 * 60)?,
            page_size: parse_var("APP_EXPORT_PAGE_SIZE", 500)?,
            lead_list_attempts: parse_var("APP_LEAD_LIST_ATTEMPTS", 2)?,
        };
        if export.page_size == 0 {
            return Err(ConfigError::InvalidNumber {
                key: "APP_EXPORT_PAGE_SIZE",
            });
        }

        let auth = AuthConfig::parse_tokens(&env::var("APP_API_TOKENS").unwrap_or_default())?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            database,
            storage,
            export,
            auth,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        None => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Json,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Where coach directory data comes from. Postgres wins when both are set.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_key: String,
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

/// Object storage for generated CSV files.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub local_dir: PathBuf,
    pub supabase: Option<SupabaseConfig>,
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub signed_url_ttl_secs: u64,
    pub page_size: u32,
    pub lead_list_attempts: u32,
}

/// Bearer tokens accepted by the HTTP surface, each mapped to the user it authenticates.
#[derive(Clone, Default)]
pub struct AuthConfig {
    pub api_tokens: Vec<(String, String)>,
}

impl AuthConfig {
    /// Parses `user:token` pairs separated by commas.
    pub fn parse_tokens(raw: &str) -> Result<Self, ConfigError> {
        let mut api_tokens = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            match entry.split_once(':') {
                Some((user, token)) if !user.trim().is_empty() && !token.trim().is_empty() => {
                    api_tokens.push((user.trim().to_string(), token.trim().to_string()));
                }
                _ => return Err(ConfigError::InvalidApiToken),
            }
        }
        Ok(Self { api_tokens })
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let users: Vec<&str> = self.api_tokens.iter().map(|(user, _)| user.as_str()).collect();
        f.debug_struct("AuthConfig").field("users", &users).finish()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    IncompleteSupabase,
    InvalidApiToken,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a positive integer")
            }
            ConfigError::IncompleteSupabase => write!(
                f,
                "SUPABASE_URL and SUPABASE_SERVICE_KEY must be set together"
            ),
            ConfigError::InvalidApiToken => {
                write!(f, "APP_API_TOKENS entries must look like user:token")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
