//! Service configuration

use anyhow::{Context, Result};
use renewal_lib::predictor::{ModelSource, ModelSources};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable naming an alternate config file
pub const CONFIG_PATH_ENV: &str = "RENEWAL_CONFIG";

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Instance name attached to every log line
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_bagging_model_path")]
    pub bagging_model_path: PathBuf,

    /// Expected SHA-256 of the bagging artifact
    #[serde(default)]
    pub bagging_model_sha256: Option<String>,

    #[serde(default = "default_boosting_model_path")]
    pub boosting_model_path: PathBuf,

    /// Expected SHA-256 of the boosting artifact
    #[serde(default)]
    pub boosting_model_sha256: Option<String>,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8000
}

fn default_bagging_model_path() -> PathBuf {
    PathBuf::from("models/bagging_model.onnx")
}

fn default_boosting_model_path() -> PathBuf {
    PathBuf::from("models/boosting_model.onnx")
}

impl ServiceConfig {
    /// Load configuration from an optional `renewal.*` file and `RENEWAL_*`
    /// environment variables, the latter taking precedence
    pub fn load() -> Result<Self> {
        let file = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "renewal".to_string());

        config::Config::builder()
            .add_source(config::File::with_name(&file).required(false))
            .add_source(config::Environment::with_prefix("RENEWAL").try_parsing(true))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.api_port)
    }

    pub fn model_sources(&self) -> ModelSources {
        let source = |path: &PathBuf, checksum: &Option<String>| {
            let source = ModelSource::new(path.clone());
            match checksum {
                Some(expected) => source.with_checksum(expected.clone()),
                None => source,
            }
        };
        ModelSources {
            bagging: source(&self.bagging_model_path, &self.bagging_model_sha256),
            boosting: source(&self.boosting_model_path, &self.boosting_model_sha256),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use std::sync::{Mutex, OnceLock};

    // Serializes tests that touch the process environment
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    const RENEWAL_VARS: &[&str] = &[
        CONFIG_PATH_ENV,
        "RENEWAL_INSTANCE_NAME",
        "RENEWAL_BIND_ADDRESS",
        "RENEWAL_API_PORT",
        "RENEWAL_BAGGING_MODEL_PATH",
        "RENEWAL_BAGGING_MODEL_SHA256",
        "RENEWAL_BOOSTING_MODEL_PATH",
        "RENEWAL_BOOSTING_MODEL_SHA256",
    ];

    fn clear_env() {
        for var in RENEWAL_VARS {
            env::remove_var(var);
        }
    }

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let _guard = env_lock();
        clear_env();

        let config = ServiceConfig::load().unwrap();

        assert_eq!(config.listen_addr(), "0.0.0.0:8000");
        assert_eq!(
            config.bagging_model_path,
            PathBuf::from("models/bagging_model.onnx")
        );
        assert_eq!(
            config.boosting_model_path,
            PathBuf::from("models/boosting_model.onnx")
        );
        assert!(config.bagging_model_sha256.is_none());
    }

    #[test]
    fn test_config_env_selects_file() {
        let _guard = env_lock();
        clear_env();
        let file = write_config(
            r#"
instance_name = "renewal-a"
api_port = 9100
bagging_model_path = "/srv/models/bag.onnx"
boosting_model_sha256 = "abc123"
"#,
        );
        env::set_var(CONFIG_PATH_ENV, file.path());

        let config = ServiceConfig::load();
        clear_env();
        let config = config.unwrap();

        assert_eq!(config.instance_name, "renewal-a");
        assert_eq!(config.api_port, 9100);

        let sources = config.model_sources();
        assert_eq!(sources.bagging.path, PathBuf::from("/srv/models/bag.onnx"));
        assert!(sources.bagging.checksum.is_none());
        assert_eq!(sources.boosting.checksum.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_env_overrides_file() {
        let _guard = env_lock();
        clear_env();
        let file = write_config(
            r#"
api_port = 9100
bagging_model_path = "/srv/models/bag.onnx"
"#,
        );
        env::set_var(CONFIG_PATH_ENV, file.path());
        env::set_var("RENEWAL_API_PORT", "9200");
        env::set_var("RENEWAL_BAGGING_MODEL_PATH", "/opt/bag.onnx");
        env::set_var("RENEWAL_BOOSTING_MODEL_PATH", "/opt/boost.onnx");

        let config = ServiceConfig::load();
        clear_env();
        let config = config.unwrap();

        assert_eq!(config.api_port, 9200);
        let sources = config.model_sources();
        assert_eq!(sources.bagging.path, PathBuf::from("/opt/bag.onnx"));
        assert_eq!(sources.boosting.path, PathBuf::from("/opt/boost.onnx"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let _guard = env_lock();
        clear_env();
        let file = write_config("api_port = 700000\n");
        env::set_var(CONFIG_PATH_ENV, file.path());

        let result = ServiceConfig::load();
        clear_env();
        assert!(result.is_err());
    }
}
