#![forbid(unsafe_code)]

use pm_core::model::{PlanoMatch, UnknownFieldPolicy};
use pm_storage::StoreOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub(crate) const CONFIG_ENV: &str = "PLANOMAP_CONFIG";
pub(crate) const STORAGE_DIR_ENV: &str = "PLANOMAP_STORAGE_DIR";
pub(crate) const LOG_ENV: &str = "PLANOMAP_LOG";

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("{flag} expects a value")]
    MissingValue { flag: String },
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ConnectionsConfig {
    pub(crate) plano_match: PlanoMatch,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ServerConfig {
    pub(crate) storage_dir: PathBuf,
    /// `tracing_subscriber::EnvFilter` directive.
    pub(crate) log: String,
    pub(crate) unknown_fields: UnknownFieldPolicy,
    pub(crate) connections: ConnectionsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(".planomap"),
            log: "info".to_string(),
            unknown_fields: UnknownFieldPolicy::default(),
            connections: ConnectionsConfig::default(),
        }
    }
}

#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    storage_dir: Option<PathBuf>,
}

impl ServerConfig {
    /// Defaults, then the YAML file, then environment, then command-line flags.
    pub(crate) fn load(
        args: &[String],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let cli = parse_cli(args)?;
        let config_path = cli
            .config
            .clone()
            .or_else(|| env(CONFIG_ENV).filter(|v| !v.trim().is_empty()).map(PathBuf::from));

        let mut config = match config_path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Some(dir) = env(STORAGE_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            config.storage_dir = PathBuf::from(dir);
        }
        if let Some(filter) = env(LOG_ENV).filter(|v| !v.trim().is_empty()) {
            config.log = filter;
        }
        if let Some(dir) = cli.storage_dir {
            config.storage_dir = dir;
        }
        Ok(config)
    }

    pub(crate) fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub(crate) fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub(crate) fn store_options(&self) -> StoreOptions {
        StoreOptions {
            unknown_fields: self.unknown_fields,
            plano_match: self.connections.plano_match,
        }
    }
}

fn parse_cli(args: &[String]) -> Result<CliArgs, ConfigError> {
    let mut out = CliArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let slot = match arg.as_str() {
            "--config" => &mut out.config,
            "--storage-dir" => &mut out.storage_dir,
            other => return Err(ConfigError::UnknownArgument(other.to_string())),
        };
        let Some(value) = iter.next() else {
            return Err(ConfigError::MissingValue { flag: arg.clone() });
        };
        *slot = Some(PathBuf::from(value));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn defaults_apply_without_inputs() {
        let config = ServerConfig::load(&[], |_| None).expect("load");
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.storage_dir, PathBuf::from(".planomap"));
        assert_eq!(config.store_options(), StoreOptions::default());
    }

    #[test]
    fn yaml_sets_policies() {
        let config = ServerConfig::from_yaml_str(
            "storage_dir: /var/lib/planomap\nlog: debug\nunknown_fields: reject\nconnections:\n  plano_match: from\n",
        )
        .expect("parse");
        assert_eq!(config.storage_dir, PathBuf::from("/var/lib/planomap"));
        assert_eq!(config.log, "debug");
        assert_eq!(config.unknown_fields, UnknownFieldPolicy::Reject);
        assert_eq!(config.connections.plano_match, PlanoMatch::From);

        assert!(ServerConfig::from_yaml_str("unknown_fields: maybe\n").is_err());
        assert!(ServerConfig::from_yaml_str("storage: x\n").is_err());
        assert_eq!(
            ServerConfig::from_yaml_str("  \n").expect("blank"),
            ServerConfig::default()
        );
    }

    #[test]
    fn env_overrides_file_and_cli_overrides_env() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("planomap.yaml");
        std::fs::write(&path, "storage_dir: from-file\nlog: warn\n").expect("write config");

        let env = HashMap::from([
            (CONFIG_ENV, path.to_string_lossy().to_string()),
            (STORAGE_DIR_ENV, "from-env".to_string()),
            (LOG_ENV, "trace".to_string()),
        ]);
        let lookup = |key: &str| env.get(key).cloned();

        let config = ServerConfig::load(&[], lookup).expect("load");
        assert_eq!(config.storage_dir, PathBuf::from("from-env"));
        assert_eq!(config.log, "trace");

        let config =
            ServerConfig::load(&args(&["--storage-dir", "from-cli"]), lookup).expect("load");
        assert_eq!(config.storage_dir, PathBuf::from("from-cli"));
    }

    #[test]
    fn bad_arguments_are_reported() {
        assert!(matches!(
            ServerConfig::load(&args(&["--storage-dir"]), |_| None),
            Err(ConfigError::MissingValue { .. })
        ));
        assert!(matches!(
            ServerConfig::load(&args(&["--verbose"]), |_| None),
            Err(ConfigError::UnknownArgument(_))
        ));
        assert!(matches!(
            ServerConfig::load(&args(&["--config", "/definitely/missing.yaml"]), |_| None),
            Err(ConfigError::Read { .. })
        ));
    }
}
