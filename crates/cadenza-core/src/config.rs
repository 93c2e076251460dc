//! Configuration module
//!
//! Configuration is read from the environment (after loading `.env` when present),
//! with defaults for everything except the database URL and backend credentials.

use std::env;

use crate::constants::{
    DEFAULT_MAX_AUDIO_SIZE_MB, DEFAULT_MAX_IMAGE_SIZE_MB, DEFAULT_PENDING_UPLOAD_TTL_HOURS,
    DEFAULT_SIGNED_URL_EXPIRY_SECS, DEFAULT_UPLOAD_RECORD_RETENTION_DAYS,
};
use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const RECLAMATION_INTERVAL_SECS: u64 = 3600;
const SUBMISSION_RATE_LIMIT_PER_HOUR: u32 = 10;
const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Server and database settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// Storage and upload lifecycle settings
#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, R2, ...)
    pub s3_endpoint: Option<String>,
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    /// Public read base URL for the local backend
    pub local_storage_base_url: Option<String>,
    /// Base URL of the signed write endpoint for the local backend
    pub local_storage_upload_url: Option<String>,
    pub upload_signing_secret: Option<String>,
    pub signed_url_expiry_secs: u64,
    pub max_audio_size_bytes: u64,
    pub max_image_size_bytes: u64,
    pub pending_upload_ttl_hours: i64,
    /// 0 disables the reclamation loop
    pub reclamation_interval_secs: u64,
    pub upload_record_retention_days: i64,
    /// 0 disables submission rate limiting
    pub submission_rate_limit_per_hour: u32,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    base: BaseConfig,
    upload: Box<UploadConfig>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn new(base: BaseConfig, upload: UploadConfig) -> Self {
        Config {
            base,
            upload: Box::new(upload),
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let storage_backend = match env_opt("STORAGE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StorageBackend::S3,
        };

        let upload = UploadConfig {
            storage_backend,
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION"),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            aws_region: env_opt("AWS_REGION"),
            local_storage_path: env_opt("LOCAL_STORAGE_PATH"),
            local_storage_base_url: env_opt("LOCAL_STORAGE_BASE_URL"),
            local_storage_upload_url: env_opt("LOCAL_STORAGE_UPLOAD_URL"),
            upload_signing_secret: env_opt("UPLOAD_SIGNING_SECRET"),
            signed_url_expiry_secs: env_or("SIGNED_URL_EXPIRY_SECS", DEFAULT_SIGNED_URL_EXPIRY_SECS),
            max_audio_size_bytes: env_or("MAX_AUDIO_SIZE_MB", DEFAULT_MAX_AUDIO_SIZE_MB) * 1024 * 1024,
            max_image_size_bytes: env_or("MAX_IMAGE_SIZE_MB", DEFAULT_MAX_IMAGE_SIZE_MB) * 1024 * 1024,
            pending_upload_ttl_hours: env_or(
                "PENDING_UPLOAD_TTL_HOURS",
                DEFAULT_PENDING_UPLOAD_TTL_HOURS,
            ),
            reclamation_interval_secs: env_or(
                "RECLAMATION_INTERVAL_SECS",
                RECLAMATION_INTERVAL_SECS,
            ),
            upload_record_retention_days: env_or(
                "UPLOAD_RECORD_RETENTION_DAYS",
                DEFAULT_UPLOAD_RECORD_RETENTION_DAYS,
            ),
            submission_rate_limit_per_hour: env_or(
                "SUBMISSION_RATE_LIMIT_PER_HOUR",
                SUBMISSION_RATE_LIMIT_PER_HOUR,
            ),
        };

        let config = Config::new(base, upload);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.base.database_url.starts_with("postgres://")
            && !self.base.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.is_production() && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.upload.pending_upload_ttl_hours <= 0 {
            return Err(anyhow::anyhow!("PENDING_UPLOAD_TTL_HOURS must be positive"));
        }

        match self.upload.storage_backend {
            StorageBackend::S3 => {
                if self.upload.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.upload.s3_region.is_none() && self.upload.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.upload.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.upload.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
                match self.upload.upload_signing_secret.as_deref() {
                    Some(secret) if secret.len() >= MIN_SIGNING_SECRET_LEN => {}
                    _ => {
                        return Err(anyhow::anyhow!(
                            "UPLOAD_SIGNING_SECRET must be at least {} characters long for local storage",
                            MIN_SIGNING_SECRET_LEN
                        ))
                    }
                }
            }
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.base.cors_origins
    }

    pub fn database_url(&self) -> &str {
        &self.base.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.base.db_timeout_seconds
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }

    pub fn upload(&self) -> &UploadConfig {
        &self.upload
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.upload.storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.upload.s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.upload.s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.upload.s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.upload.aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.upload.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.upload.local_storage_base_url.as_deref()
    }

    pub fn local_storage_upload_url(&self) -> Option<&str> {
        self.upload.local_storage_upload_url.as_deref()
    }

    pub fn upload_signing_secret(&self) -> Option<&str> {
        self.upload.upload_signing_secret.as_deref()
    }

    pub fn signed_url_expiry_secs(&self) -> u64 {
        self.upload.signed_url_expiry_secs
    }

    pub fn max_audio_size_bytes(&self) -> u64 {
        self.upload.max_audio_size_bytes
    }

    pub fn max_image_size_bytes(&self) -> u64 {
        self.upload.max_image_size_bytes
    }

    pub fn pending_upload_ttl_hours(&self) -> i64 {
        self.upload.pending_upload_ttl_hours
    }

    pub fn reclamation_interval_secs(&self) -> u64 {
        self.upload.reclamation_interval_secs
    }

    pub fn upload_record_retention_days(&self) -> i64 {
        self.upload.upload_record_retention_days
    }

    pub fn submission_rate_limit_per_hour(&self) -> u32 {
        self.upload.submission_rate_limit_per_hour
    }
}
