//! 开关配置来源
//!
//! 引擎本身不关心配置从哪里来，只依赖 `FlagSource` 产出完整的配置快照。

use crate::error::{FlagError, Result};
use crate::models::FlagConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 配置来源抽象
///
/// 每次调用 `fetch` 返回一份完整配置，由调用方决定何时刷新。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FlagSource: Send + Sync {
    async fn fetch(&self) -> Result<FlagConfig>;
}

/// 从本地 JSON 文件读取配置
#[derive(Debug, Clone)]
pub struct FileFlagSource {
    path: PathBuf,
}

impl FileFlagSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FlagSource for FileFlagSource {
    async fn fetch(&self) -> Result<FlagConfig> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| FlagError::Io {
                path: self.path.clone(),
                source,
            })?;

        let config = FlagConfig::from_json(&content)?;
        debug!(path = ?self.path, flags = config.len(), "开关配置文件已读取");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_fetch_from_file() {
        let dir = std::env::temp_dir().join("flag-engine-source");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("flags.json");
        fs::write(
            &path,
            r#"{ "beta": { "key": "beta", "defaultValue": false, "rules": [{ "percentage": 10 }] } }"#,
        )
        .unwrap();

        let config = FileFlagSource::new(&path).fetch().await.unwrap();
        assert_eq!(config.len(), 1);
        assert_eq!(config.get("beta").unwrap().rules[0].percentage, Some(10.0));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let source = FileFlagSource::new("/nonexistent/flags.json");
        let err = source.fetch().await.unwrap_err();
        assert_eq!(err.code(), "IO_ERROR");
        assert!(err.to_string().contains("flags.json"));
    }

    #[tokio::test]
    async fn test_malformed_file() {
        let dir = std::env::temp_dir().join("flag-engine-source-malformed");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("flags.json");
        fs::write(&path, "{ not json").unwrap();

        let err = FileFlagSource::new(&path).fetch().await.unwrap_err();
        assert_eq!(err.code(), "PARSE_ERROR");
    }
}
