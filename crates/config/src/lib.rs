//! Configuration for the `dataname` tool.
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. Built-in defaults.
//! 2. `config.toml`, `config.yaml` and `config.json` in the user's
//!    configuration directory (if they exist).
//! 3. A file named on the command line.
//! 4. Environment variables prefixed with `DATANAME_`, nested with `__`
//!    (`DATANAME_STORAGE__PATH=/srv/datasets`).

pub mod error;

use crate::error::{ErrorKind, Result};
use dataname_catalog::Strategy;
use dataname_naming::{Calendar, DatePattern};
use directories::ProjectDirs;
use exn::{OptionExt, ResultExt};
use figment::Figment;
use figment::providers::{Env, Format, Json, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "DATANAME_";
const FILE_STEM: &str = "config";

/// Where dataset files are stored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// A directory on the local filesystem.
    Local { path: PathBuf },
    /// An S3-compatible bucket.
    S3 {
        bucket: String,
        #[serde(default)]
        prefix: Option<String>,
        region: String,
        #[serde(default)]
        endpoint: Option<String>,
        key_id: String,
        #[serde(skip_serializing)]
        key_secret: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub storage: Option<StorageConfig>,
    /// Folder of schema definitions declaring the known dataset names.
    pub schemas: Option<PathBuf>,
    /// Calendar for "today" and for timestamps in log names.
    pub calendar: Calendar,
    /// Bucket key when listing in date order.
    pub date_pattern: DatePattern,
    /// How a safe filename picks its version.
    pub strategy: Strategy,
}

impl Config {
    /// Load from every source, reading user files from [`config_dir`].
    ///
    /// A platform without a configuration directory isn't an error here;
    /// the user files are skipped.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let dir = match config_dir() {
            Ok(dir) => Some(dir),
            Err(err) => {
                tracing::debug!(error = %err, "Skipping user configuration files");
                None
            },
        };
        Self::figment(dir.as_deref(), explicit)?.extract().or_raise(|| ErrorKind::Load)
    }

    /// The merged sources, with user files read from `dir`.
    ///
    /// # Errors
    ///
    /// [`FileNotFound`](ErrorKind::FileNotFound) if `explicit` names a file
    /// that doesn't exist. Missing files in `dir` are skipped.
    pub fn figment(dir: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::new();
        if let Some(dir) = dir {
            tracing::trace!(dir = %dir.display(), "Reading user configuration");
            figment = figment
                .merge(Toml::file(dir.join(format!("{FILE_STEM}.toml"))))
                .merge(Yaml::file(dir.join(format!("{FILE_STEM}.yaml"))))
                .merge(Json::file(dir.join(format!("{FILE_STEM}.json"))));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::FileNotFound(path.to_path_buf()));
            }
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }
}

/// The per-user configuration directory, e.g. `~/.config/dataname` on Linux.
pub fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "dataname")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_raise(|| ErrorKind::NoConfigDir)
}
