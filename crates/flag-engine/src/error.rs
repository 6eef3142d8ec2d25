//! 开关引擎错误类型
//!
//! 只有配置加载阶段会产生错误；评估路径永不返回 `Err`。

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlagError {
    #[error("读取开关配置失败: {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("开关配置解析失败: {0}")]
    Json(#[from] serde_json::Error),

    #[error("配置源错误: {0}")]
    Source(String),
}

impl FlagError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "IO_ERROR",
            Self::Json(_) => "PARSE_ERROR",
            Self::Source(_) => "SOURCE_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, FlagError>;
