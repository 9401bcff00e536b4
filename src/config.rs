//! Configuration resolution.
//!
//! Settings come from command-line flags and environment variables (both
//! handled by clap), then an optional TOML settings file, then defaults. The
//! result is a plain [`LoaderConfig`] handed to the merge engine.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LoaderError, LoaderResult};
use crate::keystore::DEFAULT_PASSWORD;

pub const KEYSTORE_ENV: &str = "CACERTS_LOADER_KEYSTORE";
pub const BUNDLE_ENV: &str = "SSL_CERT_FILE";
pub const CERT_DIR_ENV: &str = "SSL_CERT_DIR";
pub const PASSWORD_ENV: &str = "CACERTS_LOADER_PASSWORD";
pub const ALIAS_PREFIX_ENV: &str = "CACERTS_LOADER_ALIAS_PREFIX";
pub const CONFIG_ENV: &str = "CACERTS_LOADER_CONFIG";

pub const DEFAULT_BUNDLE_PATH: &str = "/etc/ssl/certs/ca-certificates.crt";
pub const DEFAULT_ALIAS_PREFIX: &str = "openssl";

/// Fully resolved inputs for one merge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Keystore to update. `None` when nothing supplied it.
    pub keystore: Option<PathBuf>,
    pub bundle: PathBuf,
    pub cert_dirs: Vec<PathBuf>,
    pub password: String,
    pub alias_prefix: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            keystore: None,
            bundle: PathBuf::from(DEFAULT_BUNDLE_PATH),
            cert_dirs: Vec::new(),
            password: DEFAULT_PASSWORD.to_string(),
            alias_prefix: DEFAULT_ALIAS_PREFIX.to_string(),
        }
    }
}

impl LoaderConfig {
    pub fn new(keystore: impl Into<PathBuf>, bundle: impl Into<PathBuf>) -> Self {
        Self {
            keystore: Some(keystore.into()),
            bundle: bundle.into(),
            ..Self::default()
        }
    }

    /// The keystore path, or the configuration error naming how to supply it.
    pub fn keystore_path(&self) -> LoaderResult<&Path> {
        self.keystore.as_deref().ok_or_else(|| {
            LoaderError::Configuration(format!(
                "keystore path must be set (${KEYSTORE_ENV} or --keystore)"
            ))
        })
    }
}

/// One layer of optional settings. Also the schema of the TOML settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct Settings {
    pub keystore: Option<PathBuf>,
    pub bundle: Option<PathBuf>,
    pub cert_dirs: Option<Vec<PathBuf>>,
    pub password: Option<String>,
    pub alias_prefix: Option<String>,
}

impl Settings {
    /// Load a settings file. A named file that is missing is an error.
    pub fn load(path: &Path) -> Result<Settings> {
        let s = fs::read_to_string(path)
            .with_context(|| format!("read settings: {}", path.display()))?;
        let settings: Settings =
            toml::from_str(&s).with_context(|| format!("parse settings: {}", path.display()))?;
        Ok(settings)
    }

    /// Fill unset values from `lower`.
    pub fn or(self, lower: Settings) -> Settings {
        Settings {
            keystore: self.keystore.or(lower.keystore),
            bundle: self.bundle.or(lower.bundle),
            cert_dirs: self.cert_dirs.or(lower.cert_dirs),
            password: self.password.or(lower.password),
            alias_prefix: self.alias_prefix.or(lower.alias_prefix),
        }
    }

    pub fn into_config(self) -> LoaderConfig {
        let defaults = LoaderConfig::default();
        LoaderConfig {
            keystore: self.keystore,
            bundle: self.bundle.unwrap_or(defaults.bundle),
            cert_dirs: self.cert_dirs.unwrap_or(defaults.cert_dirs),
            password: self.password.unwrap_or(defaults.password),
            alias_prefix: self.alias_prefix.unwrap_or(defaults.alias_prefix),
        }
    }
}
