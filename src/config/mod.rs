/// Configuration for the Calico manifest generator
use nix::unistd::{Uid, User};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Errors raised while resolving the generator configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("home directory not found. Set HOME environment variable or pass --home")]
    HomeNotFound,

    #[error("failed to look up passwd entry for uid {uid}: {source}")]
    Passwd { uid: Uid, source: nix::Error },

    #[error("home directory {0:?} is not valid UTF-8")]
    NonUtf8Home(PathBuf),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Optional settings loaded from a YAML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// Home directory substituted into the kubelet host path
    #[serde(default)]
    pub home_dir: Option<PathBuf>,

    /// Directory the manifests are written to
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Values substituted into every template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionContext {
    pub home_dir: String,
    pub cluster_cidr: String,
}

/// Fully resolved generator configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub context: SubstitutionContext,
    pub output_dir: PathBuf,
}

impl GeneratorConfig {
    /// Resolve the configuration.
    ///
    /// Explicit overrides win over the config file, which wins over the
    /// process environment.
    pub fn resolve(
        cluster_cidr: String,
        home_override: Option<PathBuf>,
        output_override: Option<PathBuf>,
        file: FileConfig,
    ) -> Result<Self, ConfigError> {
        let home_dir = resolve_home(home_override, file.home_dir, std::env::var_os("HOME"))?;

        let output_dir = output_override
            .or(file.output_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        if !looks_like_cidr(&cluster_cidr) {
            warn!(
                "Cluster CIDR {:?} has no prefix length, passing it through unchanged",
                cluster_cidr
            );
        }

        Ok(Self {
            context: SubstitutionContext {
                home_dir,
                cluster_cidr,
            },
            output_dir,
        })
    }
}

/// Pick the first available home directory source.
///
/// An unset `HOME` falls back to the passwd entry of the current user.
fn resolve_home(
    home_override: Option<PathBuf>,
    file_home: Option<PathBuf>,
    env_home: Option<OsString>,
) -> Result<String, ConfigError> {
    let home = match home_override.or(file_home) {
        Some(home) => home,
        None => match env_home {
            Some(home) => PathBuf::from(home),
            None => home_from_passwd()?,
        },
    };
    normalize_home(home)
}

fn home_from_passwd() -> Result<PathBuf, ConfigError> {
    let uid = Uid::current();
    User::from_uid(uid)
        .map_err(|source| ConfigError::Passwd { uid, source })?
        .map(|user| user.dir)
        .ok_or(ConfigError::HomeNotFound)
}

/// Strip trailing slashes; an empty result becomes `/`
fn normalize_home(home: PathBuf) -> Result<String, ConfigError> {
    let home = home
        .into_os_string()
        .into_string()
        .map_err(|raw| ConfigError::NonUtf8Home(PathBuf::from(raw)))?;

    match home.trim_end_matches('/') {
        "" => Ok("/".to_string()),
        trimmed => Ok(trimmed.to_string()),
    }
}

/// Loose CIDR check, only used to warn
fn looks_like_cidr(cidr: &str) -> bool {
    cidr.contains('/')
}
