//! 行协议请求处理
//!
//! 每行一个 JSON 请求，每个请求输出一行 JSON 响应：
//!
//! ```text
//! {"flag": "beta", "kind": "bool", "context": {"userId": "user-1"}}
//! {"flag": "color", "kind": "variant", "context": {}}
//! {"kind": "all", "context": {"attributes": {"plan": "premium"}}}
//! ```
//!
//! 无法解析的行返回 `{"error": "..."}`，不会中断处理。

use crate::models::{Context, FlagEvaluation};
use crate::store::FlagStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// 评估方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationKind {
    #[default]
    Bool,
    Variant,
    All,
}

/// 评估请求
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationRequest {
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(default)]
    pub kind: EvaluationKind,
    #[serde(default)]
    pub context: Context,
}

/// 评估响应
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EvaluationResponse {
    Single(FlagEvaluation),
    All(BTreeMap<String, FlagEvaluation>),
    Error { error: String },
}

impl EvaluationResponse {
    fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }
}

/// 处理单行请求
pub fn handle_line(store: &FlagStore, line: &str) -> EvaluationResponse {
    let request: EvaluationRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "无法解析评估请求");
            return EvaluationResponse::error(format!("invalid request: {}", e));
        }
    };

    handle(store, request)
}

/// 处理已解析的请求
pub fn handle(store: &FlagStore, request: EvaluationRequest) -> EvaluationResponse {
    let EvaluationRequest {
        flag,
        kind,
        context,
    } = request;

    match (kind, flag) {
        (EvaluationKind::All, _) => EvaluationResponse::All(store.evaluate_all(&context)),
        (EvaluationKind::Bool, Some(flag)) => {
            EvaluationResponse::Single(FlagEvaluation::Bool(store.eval_bool(&flag, &context)))
        }
        (EvaluationKind::Variant, Some(flag)) => EvaluationResponse::Single(
            FlagEvaluation::Variant(store.eval_variant(&flag, &context)),
        ),
        (_, None) => {
            warn!(?kind, "评估请求缺少 flag 字段");
            EvaluationResponse::error("missing field `flag`")
        }
    }
}

/// 逐行读取请求并写出响应，直到输入结束
///
/// 返回处理的请求行数，空行忽略。
pub async fn serve<R, W>(store: &FlagStore, reader: R, mut writer: W) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = handle_line(store, line);
        let mut payload = serde_json::to_vec(&response)?;
        payload.push(b'\n');
        writer.write_all(&payload).await?;
        writer.flush().await?;
        handled += 1;
    }

    debug!(handled, "输入结束");
    Ok(handled)
}
