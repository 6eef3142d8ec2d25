//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::observability::ObservabilityConfig;

/// 环境变量前缀，如 FLAG_ENGINE_FLAGS__PATH -> flags.path
pub const ENV_PREFIX: &str = "FLAG_ENGINE";

/// 开关配置文件来源
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlagsConfig {
    /// JSON 格式的开关配置文件路径
    pub path: String,
}

impl Default for FlagsConfig {
    fn default() -> Self {
        Self {
            path: "config/flags.json".to_string(),
        }
    }
}

impl FlagsConfig {
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub flags: FlagsConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（FLAG_ENGINE_ 前缀，`__` 分隔层级）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
        Self::load_from(service_name, Path::new(&config_dir))
    }

    /// 从指定目录加载配置
    pub fn load_from(service_name: &str, config_dir: &Path) -> Result<Self, ConfigError> {
        let env = std::env::var("FLAG_ENGINE_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.flags.path, "config/flags.json");
        assert_eq!(config.observability.log_level, "info");
        assert!(!config.is_production());
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let dir = std::env::temp_dir().join("flag-shared-config-empty");
        let config = AppConfig::load_from("flag-engine", &dir).unwrap();

        assert_eq!(config.service_name, "flag-engine");
        assert_eq!(config.flags.path(), PathBuf::from("config/flags.json"));
    }

    #[test]
    fn test_service_file_overrides_defaults() {
        let dir = std::env::temp_dir().join("flag-shared-config-service");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("flag-engine-test.toml"),
            r#"
            [flags]
            path = "/etc/flags/production.json"

            [observability]
            log_level = "debug"
            log_format = "json"
            "#,
        )
        .unwrap();

        let config = AppConfig::load_from("flag-engine-test", &dir).unwrap();

        assert_eq!(config.flags.path, "/etc/flags/production.json");
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.observability.json_logs());
    }
}
