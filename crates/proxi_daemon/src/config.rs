use anyhow::Context;
use proxi_core::InputType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const DATA_DIR_NAME: &str = ".proxi";

/// Returns the ~/.proxi directory, creating it if needed. Uses `.proxi` in the
/// working directory when the home directory is unknown or not writable.
pub fn proxi_data_dir() -> PathBuf {
    data_dir_under(dirs::home_dir())
}

fn data_dir_under(home: Option<PathBuf>) -> PathBuf {
    if let Some(home) = home {
        let path = home.join(DATA_DIR_NAME);
        match fs::create_dir_all(&path) {
            Ok(()) => return path,
            Err(e) => warn!(error = %e, path = %path.display(), "Could not create data dir"),
        }
    } else {
        warn!("Could not determine home directory");
    }

    let local = PathBuf::from(DATA_DIR_NAME);
    if let Err(e) = fs::create_dir_all(&local) {
        warn!(error = %e, "Could not create local .proxi; config will not be saved");
    }
    local
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModelConfig {
    /// Path to the ONNX classifier
    pub path: Option<PathBuf>,
    /// Element type of the model input tensor
    #[serde(default)]
    pub input_type: InputType,
    /// Serve a fixed score instead of loading a model
    pub constant_score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind on all interfaces regardless of `host`
    #[serde(default)]
    pub public: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public: false,
        }
    }
}

impl ApiConfig {
    pub fn bind_addr(&self) -> String {
        if self.public || std::env::var("PROXI_PUBLIC").is_ok() {
            format!("0.0.0.0:{}", self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayConfig {
    /// CSV column holding the raw readings
    #[serde(default = "default_column")]
    pub column: String,
}

fn default_column() -> String {
    "Valor".to_string()
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            column: default_column(),
        }
    }
}

impl Config {
    pub fn get_config_path() -> PathBuf {
        let mut path = proxi_data_dir();
        path.push("config.toml");
        path
    }

    /// Loads `explicit` if given (it must exist), otherwise the default
    /// location, writing a default config there on first use.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        let path = Self::get_config_path();
        if !path.exists() {
            let config = Config::default();
            if let Err(e) = config.save_to(&path) {
                warn!(error = %e, path = %path.display(), "Could not write default config");
            }
            return Ok(config);
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let toml = toml::to_string_pretty(self)?;
        fs::write(path, toml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.replay.column, "Valor");
        assert_eq!(config.model.input_type, InputType::U8);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [model]
            path = "models/classifier.onnx"
            input_type = "f32"

            [api]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(
            config.model.path.as_deref(),
            Some(Path::new("models/classifier.onnx"))
        );
        assert_eq!(config.model.input_type, InputType::F32);
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.api.host, "127.0.0.1");
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.model.constant_score = Some(12.5);
        config.replay.column = "distance".to_string();
        config.save_to(&path).unwrap();

        assert_eq!(Config::load(Some(path.as_path())).unwrap(), config);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(dir.path().join("nope.toml").as_path())).is_err());
    }

    #[test]
    fn test_data_dir_created_under_home() {
        let home = tempfile::tempdir().unwrap();
        let dir = data_dir_under(Some(home.path().to_path_buf()));
        assert_eq!(dir, home.path().join(".proxi"));
        assert!(dir.is_dir());
    }

    #[test]
    fn test_unwritable_home_falls_back_to_local() {
        let home = tempfile::tempdir().unwrap();
        // A file where the directory should go makes create_dir_all fail
        let blocker = home.path().join("file");
        fs::write(&blocker, "").unwrap();
        assert_eq!(data_dir_under(Some(blocker)), PathBuf::from(".proxi"));
    }

    #[test]
    fn test_public_binds_all_interfaces() {
        let api = ApiConfig {
            public: true,
            ..Default::default()
        };
        assert_eq!(api.bind_addr(), "0.0.0.0:8080");
    }
}
