//! Node configuration.
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults
//! 2. an optional YAML file
//! 3. `DEPOT_`-prefixed environment variables, with `__` between section
//!    and key (`DEPOT_SERVER__API_ADDR=0.0.0.0:8080`)
//! 4. command line flags, applied by the binary

use depot_lfs::LfsOptions;
use depot_repo::RepoManagerOptions;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Secret used when none is configured. Fine for local use only.
pub const DEV_SIGNING_SECRET: &str = "depot-dev-signing-secret";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the Depot node.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub repository: RepositoryConfig,
    pub lfs: LfsConfig,
    pub quota: QuotaConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// API listen address.
    pub api_addr: SocketAddr,
    /// Base URL clients reach the node at. Presigned and verify URLs are
    /// built from it.
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            public_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

/// Where repositories and LFS objects live on disk.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory.
    pub data_dir: PathBuf,
    /// Prefix of repository paths inside the data directory.
    pub repo_prefix: String,
    /// LFS object directory. Defaults to `<data_dir>/lfs`.
    pub blob_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            repo_prefix: "repos".to_string(),
            blob_dir: None,
        }
    }
}

/// Defaults for new repositories.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub default_branch: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_branch: depot_types::DEFAULT_BRANCH.to_string(),
        }
    }
}

/// Git LFS settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LfsConfig {
    /// Largest accepted object in bytes.
    pub max_object_size: u64,
    /// Lifetime of presigned transfer URLs in seconds.
    pub url_expiry_secs: u64,
    /// Key presigned URLs are signed with. Never written back out.
    #[serde(skip_serializing)]
    pub signing_secret: String,
}

impl Default for LfsConfig {
    fn default() -> Self {
        let defaults = LfsOptions::default();
        Self {
            max_object_size: defaults.max_object_size,
            url_expiry_secs: defaults.url_expiry.as_secs(),
            signing_secret: DEV_SIGNING_SECRET.to_string(),
        }
    }
}

/// Storage quota settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Bytes each owner may use. Zero means unlimited.
    pub default_quota_bytes: i64,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
    /// `pretty` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Config {
    /// Loads the configuration from an optional YAML file and the
    /// environment.
    ///
    /// A missing file is only an error when `path` was given explicitly.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Yaml)
                    .required(true),
            );
        }
        let loaded: Config = builder
            .add_source(
                ::config::Environment::with_prefix("DEPOT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Parses a YAML document, ignoring the environment.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let parsed: Config = ::config::Config::builder()
            .add_source(::config::File::from_str(yaml, ::config::FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Renders the effective configuration as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Checks values that would only fail later at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.repo_prefix.trim_matches('/').is_empty() {
            return Err(ConfigError::Invalid("storage.repo_prefix must not be empty".into()));
        }
        if self.repository.default_branch.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "repository.default_branch must not be empty".into(),
            ));
        }
        if self.lfs.url_expiry_secs == 0 {
            return Err(ConfigError::Invalid("lfs.url_expiry_secs must be positive".into()));
        }
        if self.lfs.signing_secret.is_empty() {
            return Err(ConfigError::Invalid("lfs.signing_secret must not be empty".into()));
        }
        if !self.server.public_url.starts_with("http://") && !self.server.public_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "server.public_url must be an http(s) URL, got '{}'",
                self.server.public_url
            )));
        }
        Ok(())
    }

    /// Directory LFS objects are stored in.
    pub fn blob_dir(&self) -> PathBuf {
        self.storage
            .blob_dir
            .clone()
            .unwrap_or_else(|| self.storage.data_dir.join("lfs"))
    }

    /// Returns true if the built-in signing secret is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.lfs.signing_secret == DEV_SIGNING_SECRET
    }

    /// Options for the repository manager.
    pub fn repo_options(&self) -> RepoManagerOptions {
        RepoManagerOptions {
            repo_prefix: self.storage.repo_prefix.trim_matches('/').to_string(),
            default_branch: self.repository.default_branch.clone(),
        }
    }

    /// Options for the LFS coordinator.
    pub fn lfs_options(&self) -> LfsOptions {
        LfsOptions {
            max_object_size: self.lfs.max_object_size,
            url_expiry: Duration::from_secs(self.lfs.url_expiry_secs),
            public_url: self.server.public_url.trim_end_matches('/').to_string(),
        }
    }
}
