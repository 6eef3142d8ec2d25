//! 条件操作符定义

use serde::{Deserialize, Serialize};
use std::fmt;

/// 条件操作符
///
/// 配置中出现无法识别的操作符时反序列化为 `Unknown`，该条件永不匹配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    // 宽松相等
    Eq,
    Neq,

    // 集合包含
    In,

    // 数值比较
    Gt,
    Gte,
    Lt,
    Lte,

    // 字符串子串 / 列表元素
    Contains,

    #[serde(other)]
    Unknown,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::In => "in",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_names() {
        let op: Operator = serde_json::from_str(r#""gte""#).unwrap();
        assert_eq!(op, Operator::Gte);
        assert_eq!(serde_json::to_string(&Operator::Neq).unwrap(), r#""neq""#);
    }

    #[test]
    fn test_unrecognized_operator() {
        let op: Operator = serde_json::from_str(r#""starts_with""#).unwrap();
        assert_eq!(op, Operator::Unknown);
        assert_eq!(op.to_string(), "unknown");
    }
}
