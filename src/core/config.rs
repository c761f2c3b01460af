use std::env;
use std::time::Duration;

use crate::features::files::policy::max_upload_bytes;
use crate::shared::constants::MIB;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub swagger: SwaggerConfig,
    pub minio: MinIOConfig,
    pub extraction: ExtractionConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

/// JWT verification settings. Tokens are issued elsewhere; this service only verifies them.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: Option<String>,
    pub jwt_leeway: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"***")
            .field("issuer", &self.issuer)
            .field("jwt_leeway", &self.jwt_leeway)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// MinIO/S3 storage configuration for file uploads
#[derive(Debug, Clone)]
pub struct MinIOConfig {
    /// MinIO/S3 endpoint URL
    pub endpoint: String,
    /// Access key for authentication
    pub access_key: String,
    /// Secret key for authentication
    pub secret_key: String,
    /// Bucket name for storing files
    pub bucket: String,
    /// AWS region (for S3 compatibility)
    pub region: String,
    /// Presigned URL expiry time in seconds
    pub presigned_url_expiry_secs: u32,
}

/// How the delay between extraction attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// Background metadata extraction settings
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub worker_enabled: bool,
    pub max_concurrent: usize,
    pub poll_interval: Duration,
    pub max_attempts: i32,
    pub retry_delay: Duration,
    pub backoff: BackoffKind,
    pub max_retry_delay: Duration,
    pub fetch_timeout: Duration,
    pub parse_timeout: Duration,
    pub convert_timeout: Duration,
    pub converter_bin: String,
}

/// Admin account created on first start
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub admin_email: String,
    pub admin_name: String,
    pub admin_department: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            minio: MinIOConfig::from_env()?,
            extraction: ExtractionConfig::from_env()?,
            bootstrap: BootstrapConfig::from_env()?,
        })
    }
}

impl AppConfig {
    /// Room for multipart boundaries and the non-file form fields
    const MULTIPART_OVERHEAD: u64 = MIB;

    /// Largest per-role upload ceiling plus multipart framing
    pub fn default_max_request_body_size() -> usize {
        usize::try_from(max_upload_bytes() + Self::MULTIPART_OVERHEAD).unwrap_or(usize::MAX)
    }

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::default_max_request_body_size().to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MIN_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MIN_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        let idle_timeout_secs = env::var("DB_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_lifetime_secs = env::var("DB_MAX_LIFETIME_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_LIFETIME_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_MAX_LIFETIME_SECS must be a valid number".to_string())?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        })
    }
}

impl AuthConfig {
    const DEFAULT_JWT_LEEWAY_SECS: u64 = 60; // 1 minute

    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET environment variable is required".to_string())?;
        if jwt_secret.is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }

        let issuer = env::var("JWT_ISSUER").ok().filter(|s| !s.is_empty());

        let jwt_leeway_secs = env::var("JWT_LEEWAY")
            .unwrap_or_else(|_| Self::DEFAULT_JWT_LEEWAY_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "JWT_LEEWAY must be a valid number".to_string())?;

        Ok(Self {
            jwt_secret,
            issuer,
            jwt_leeway: Duration::from_secs(jwt_leeway_secs),
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "FileVault API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Departmental file storage with metadata extraction".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl MinIOConfig {
    const DEFAULT_PRESIGNED_URL_EXPIRY_SECS: u32 = 3600; // 1 hour

    pub fn from_env() -> Result<Self, String> {
        let endpoint =
            env::var("MINIO_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".to_string());

        let access_key = env::var("MINIO_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string());

        let secret_key = env::var("MINIO_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string());

        let bucket = env::var("MINIO_BUCKET").unwrap_or_else(|_| "filevault".to_string());

        let region = env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let presigned_url_expiry_secs = env::var("MINIO_PRESIGNED_URL_EXPIRY_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_PRESIGNED_URL_EXPIRY_SECS.to_string())
            .parse::<u32>()
            .map_err(|_| "MINIO_PRESIGNED_URL_EXPIRY_SECS must be a valid number".to_string())?;

        Ok(Self {
            endpoint,
            access_key,
            secret_key,
            bucket,
            region,
            presigned_url_expiry_secs,
        })
    }

    pub fn presigned_url_expiry(&self) -> Duration {
        Duration::from_secs(u64::from(self.presigned_url_expiry_secs))
    }
}

impl BackoffKind {
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(BackoffKind::Fixed),
            "exponential" => Ok(BackoffKind::Exponential),
            other => Err(format!(
                "EXTRACTION_BACKOFF must be 'fixed' or 'exponential', got '{}'",
                other
            )),
        }
    }
}

impl ExtractionConfig {
    const DEFAULT_MAX_CONCURRENT: usize = 4;
    const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
    const DEFAULT_MAX_ATTEMPTS: i32 = 3;
    const DEFAULT_RETRY_DELAY_SECS: u64 = 60;
    const DEFAULT_MAX_RETRY_DELAY_SECS: u64 = 3600;
    const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_PARSE_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_CONVERT_TIMEOUT_SECS: u64 = 120;

    pub fn from_env() -> Result<Self, String> {
        let worker_enabled = env::var("EXTRACTION_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent = env::var("EXTRACTION_MAX_CONCURRENT")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONCURRENT.to_string())
            .parse::<usize>()
            .map_err(|_| "EXTRACTION_MAX_CONCURRENT must be a valid number".to_string())?
            .max(1);

        let poll_interval_ms = env::var("EXTRACTION_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| Self::DEFAULT_POLL_INTERVAL_MS.to_string())
            .parse::<u64>()
            .map_err(|_| "EXTRACTION_POLL_INTERVAL_MS must be a valid number".to_string())?;

        let max_attempts = env::var("EXTRACTION_MAX_ATTEMPTS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_ATTEMPTS.to_string())
            .parse::<i32>()
            .map_err(|_| "EXTRACTION_MAX_ATTEMPTS must be a valid number".to_string())?
            .max(1);

        let retry_delay_secs = env::var("EXTRACTION_RETRY_DELAY_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_RETRY_DELAY_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "EXTRACTION_RETRY_DELAY_SECS must be a valid number".to_string())?;

        let backoff = BackoffKind::parse(
            &env::var("EXTRACTION_BACKOFF").unwrap_or_else(|_| "fixed".to_string()),
        )?;

        let max_retry_delay_secs = env::var("EXTRACTION_MAX_RETRY_DELAY_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_RETRY_DELAY_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "EXTRACTION_MAX_RETRY_DELAY_SECS must be a valid number".to_string())?;

        let fetch_timeout_secs = env::var("EXTRACTION_FETCH_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_FETCH_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "EXTRACTION_FETCH_TIMEOUT_SECS must be a valid number".to_string())?;

        let parse_timeout_secs = env::var("EXTRACTION_PARSE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_PARSE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "EXTRACTION_PARSE_TIMEOUT_SECS must be a valid number".to_string())?;

        let convert_timeout_secs = env::var("EXTRACTION_CONVERT_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_CONVERT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "EXTRACTION_CONVERT_TIMEOUT_SECS must be a valid number".to_string())?;

        let converter_bin =
            env::var("EXTRACTION_CONVERTER_BIN").unwrap_or_else(|_| "libreoffice".to_string());

        Ok(Self {
            worker_enabled,
            max_concurrent,
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_attempts,
            retry_delay: Duration::from_secs(retry_delay_secs),
            backoff,
            max_retry_delay: Duration::from_secs(max_retry_delay_secs),
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            parse_timeout: Duration::from_secs(parse_timeout_secs),
            convert_timeout: Duration::from_secs(convert_timeout_secs),
            converter_bin,
        })
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            worker_enabled: true,
            max_concurrent: Self::DEFAULT_MAX_CONCURRENT,
            poll_interval: Duration::from_millis(Self::DEFAULT_POLL_INTERVAL_MS),
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_secs(Self::DEFAULT_RETRY_DELAY_SECS),
            backoff: BackoffKind::Fixed,
            max_retry_delay: Duration::from_secs(Self::DEFAULT_MAX_RETRY_DELAY_SECS),
            fetch_timeout: Duration::from_secs(Self::DEFAULT_FETCH_TIMEOUT_SECS),
            parse_timeout: Duration::from_secs(Self::DEFAULT_PARSE_TIMEOUT_SECS),
            convert_timeout: Duration::from_secs(Self::DEFAULT_CONVERT_TIMEOUT_SECS),
            converter_bin: "libreoffice".to_string(),
        }
    }
}

impl BootstrapConfig {
    pub fn from_env() -> Result<Self, String> {
        let admin_email =
            env::var("BOOTSTRAP_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
        let admin_name = env::var("BOOTSTRAP_ADMIN_NAME").unwrap_or_else(|_| "Admin".to_string());
        let admin_department =
            env::var("BOOTSTRAP_ADMIN_DEPARTMENT").unwrap_or_else(|_| "HQ".to_string());

        Ok(Self {
            admin_email,
            admin_name,
            admin_department,
        })
    }
}
