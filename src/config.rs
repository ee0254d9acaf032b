use crate::{error::IcddError, graph::GraphStyle, vocab};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use toml_edit::DocumentMut;

/// Global static variable to hold the config provider.
pub static CONFIG_PROVIDER: OnceCell<Arc<dyn ConfigProvider>> = OnceCell::new();

/// Key of the table holding [`IcddConfig`] inside a TOML config file.
pub const CONFIG_TABLE: &str = "icdd";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcddConfig {
    /// Root under which containers are unpacked, one directory per container guid.
    pub workfolder: PathBuf,
    /// Namespace root for the index graphs of new containers.
    pub base_uri: String,
    /// Sliding lifetime of cached open containers.
    pub cache_ttl_secs: u64,
    pub validate_on_read: bool,
    pub validate_on_export: bool,
    /// Layout of ad hoc graph exports. Index and linksets are always written pretty.
    pub graph_style: GraphStyle,
}

impl Default for IcddConfig {
    fn default() -> Self {
        IcddConfig {
            workfolder: std::env::temp_dir().join("icdd").join("containers"),
            base_uri: vocab::BASE_URI.to_string(),
            cache_ttl_secs: 600,
            validate_on_read: true,
            validate_on_export: true,
            graph_style: GraphStyle::Compact,
        }
    }
}

impl IcddConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Workfolder of the container with `guid`.
    pub fn container_dir(&self, guid: &str) -> PathBuf {
        self.workfolder.join(guid)
    }
}

pub trait ConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<IcddConfig, IcddError>;
    fn set_config(&self, config: &IcddConfig) -> Result<(), IcddError>;
}

/// Reads the `[icdd]` table of a TOML file. Writing replaces only that table and keeps the
/// rest of the file, comments included.
#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<IcddConfig, IcddError> {
        tracing::debug!("Attempting to read config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(IcddConfig::default());
        }
        let content = read_to_string(&self.path)?;
        let mut file: toml::Table = toml::from_str(&content)?;
        match file.remove(CONFIG_TABLE) {
            Some(table) => Ok(table.try_into()?),
            None => Ok(IcddConfig::default()),
        }
    }

    fn set_config(&self, config: &IcddConfig) -> Result<(), IcddError> {
        tracing::debug!("Attempting to write config to: {:?}", &self.path);
        let mut doc = match self.path.exists() {
            true => read_to_string(&self.path)?.parse::<DocumentMut>()?,
            false => DocumentMut::new(),
        };
        let table: DocumentMut = toml::to_string(config)?.parse()?;
        doc[CONFIG_TABLE] = toml_edit::Item::Table(table.as_table().clone());
        write(&self.path, doc.to_string())?;
        Ok(())
    }
}

/// Configuration from the installed provider, or defaults when none is installed or it fails.
pub fn current_config() -> IcddConfig {
    match CONFIG_PROVIDER.get() {
        Some(provider) => provider.get_config().unwrap_or_else(|err| {
            tracing::warn!("Falling back to default config: {err}");
            IcddConfig::default()
        }),
        None => IcddConfig::default(),
    }
}

pub fn get_content<P: AsRef<Path>>(path: P) -> Result<String, IcddError> {
    tracing::debug!("Reading {:?}", path.as_ref());
    Ok(read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_log::test;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let provider = TomlConfigProvider::new(dir.path().join("icdd.toml"));
        let config = provider.get_config().unwrap();
        assert_eq!(config, IcddConfig::default());
        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
    }

    #[test]
    fn test_set_config_keeps_foreign_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icdd.toml");
        std::fs::write(&path, "# shared settings\n[server]\nport = 8080\n").unwrap();
        let provider = TomlConfigProvider::new(path.clone());

        let config = IcddConfig {
            workfolder: dir.path().join("work"),
            cache_ttl_secs: 30,
            validate_on_export: false,
            ..Default::default()
        };
        provider.set_config(&config).unwrap();
        assert_eq!(provider.get_config().unwrap(), config);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("# shared settings"));
        assert!(written.contains("port = 8080"));
    }

    #[test]
    fn test_partial_table_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("icdd.toml");
        std::fs::write(&path, "[icdd]\ncache_ttl_secs = 5\ngraph_style = \"pretty\"\n").unwrap();
        let config = TomlConfigProvider::new(path).get_config().unwrap();
        assert_eq!(config.cache_ttl_secs, 5);
        assert_eq!(config.graph_style, GraphStyle::Pretty);
        assert!(config.validate_on_read);
    }
}
