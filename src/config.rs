use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};

use crate::errors::{GalleryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Local,
    Memory,
}

impl FromStr for StorageType {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(StorageType::Local),
            "memory" => Ok(StorageType::Memory),
            other => Err(GalleryError::Config(format!("unknown STORAGE_TYPE {other:?}"))),
        }
    }
}

/// What to do with orphans found at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileMode {
    Off,
    Report,
    Clean,
}

impl FromStr for ReconcileMode {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(ReconcileMode::Off),
            "report" => Ok(ReconcileMode::Report),
            "clean" => Ok(ReconcileMode::Clean),
            other => Err(GalleryError::Config(format!(
                "unknown RECONCILE_ON_STARTUP {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub upload_folder: PathBuf,
    pub max_file_size_mb: u64,
    pub database_url: String,
    pub database_max_connections: u32,
    pub storage_type: StorageType,
    pub host: String,
    pub port: u16,
    pub reconcile: ReconcileMode,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upload_folder: PathBuf::from("uploads"),
            max_file_size_mb: 100,
            database_url: "sqlite://galeria.db".to_string(),
            database_max_connections: 8,
            storage_type: StorageType::Local,
            host: "0.0.0.0".to_string(),
            port: 5000,
            reconcile: ReconcileMode::Report,
        }
    }
}

impl AppConfig {
    /// Reads the process environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup, falling back to defaults for
    /// missing keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            upload_folder: lookup("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_folder),
            max_file_size_mb: parse_var(&lookup, "MAX_FILE_SIZE_MB")?
                .unwrap_or(defaults.max_file_size_mb),
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_var(&lookup, "DATABASE_MAX_CONNECTIONS")?
                .unwrap_or(defaults.database_max_connections),
            storage_type: parse_var(&lookup, "STORAGE_TYPE")?.unwrap_or(defaults.storage_type),
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            reconcile: parse_var(&lookup, "RECONCILE_ON_STARTUP")?
                .unwrap_or(defaults.reconcile),
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| GalleryError::Config(format!("invalid host or port {}:{}", self.host, self.port)))
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| GalleryError::Config(format!("{key} has invalid value {raw:?}"))),
        None => Ok(None),
    }
}
