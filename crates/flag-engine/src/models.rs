//! 开关引擎领域模型

use crate::error::Result;
use crate::operators::Operator;
use crate::validator::{ConfigValidator, ConfigWarning};
use crate::value::AttributeValue;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 评估上下文 - 单次请求的用户标识与属性
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: HashMap<String, AttributeValue>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 对象创建
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// 用户标识，空字符串视为缺失
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }

    /// 解析属性路径
    ///
    /// 先把整个路径当作字面量 key 查找（名为 `"user.plan"` 的属性优先），
    /// 找不到时再按 `.` 拆分逐级进入嵌套映射；中途缺失或遇到非映射值返回 `None`。
    pub fn resolve(&self, path: &str) -> Option<&AttributeValue> {
        if let Some(value) = self.attributes.get(path) {
            return Some(value);
        }

        let mut segments = path.split('.');
        let mut current = self.attributes.get(segments.next()?)?;

        for segment in segments {
            match current {
                AttributeValue::Map(map) => current = map.get(segment)?,
                _ => return None,
            }
        }

        Some(current)
    }
}

/// 条件节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub attribute: String,
    pub operator: Operator,
    /// 比较值；`None` 表示配置中没有 `value` 字段，区别于显式的 `null`
    #[serde(
        default,
        deserialize_with = "deserialize_defined",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<AttributeValue>,
}

impl Condition {
    pub fn new(
        attribute: impl Into<String>,
        operator: Operator,
        value: impl Into<AttributeValue>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            value: Some(value.into()),
        }
    }

    /// 不带比较值的条件
    pub fn without_value(attribute: impl Into<String>, operator: Operator) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            value: None,
        }
    }
}

/// 字段出现即为 `Some`，包括 `null`
fn deserialize_defined<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<AttributeValue>, D::Error>
where
    D: Deserializer<'de>,
{
    AttributeValue::deserialize(deserializer).map(Some)
}

/// 字段显式为 `null` 时按缺省值处理
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// 定向规则
///
/// 条件之间为 AND 关系，空条件列表总是匹配。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, deserialize_with = "null_as_default")]
    pub conditions: Vec<Condition>,
    /// 灰度百分比（0-100），小于 100 时需要用户标识参与分桶
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    /// 布尔开关命中后的值，缺省为 true
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<bool>,
    /// 变体开关命中后的变体 key，缺省为开关默认值
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl Rule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_percentage(mut self, percentage: f64) -> Self {
        self.percentage = Some(percentage);
        self
    }

    pub fn with_value(mut self, value: bool) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }
}

/// 变体目录项，仅作参考，评估时不校验
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Variant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// 开关默认值，类型决定开关是布尔型还是变体型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    String(String),
}

impl FlagValue {
    /// 真值判断：非空字符串为 true
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::String(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// 开关定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    pub key: String,
    pub default_value: FlagValue,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rules: Vec<Rule>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub variants: Vec<Variant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Flag {
    pub fn new(key: impl Into<String>, default_value: impl Into<FlagValue>) -> Self {
        Self {
            key: key.into(),
            default_value: default_value.into(),
            rules: Vec::new(),
            variants: Vec::new(),
            description: None,
        }
    }

    /// 布尔型开关
    pub fn boolean(key: impl Into<String>, default_value: bool) -> Self {
        Self::new(key, default_value)
    }

    /// 变体型开关
    pub fn variant(key: impl Into<String>, default_variant: impl Into<String>) -> Self {
        Self::new(key, FlagValue::String(default_variant.into()))
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.default_value, FlagValue::Bool(_))
    }

    /// 在变体目录中查找
    pub fn find_variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name == name)
    }
}

/// 开关配置快照：flag key -> Flag
///
/// 开关之间的顺序不影响评估，规则顺序才有意义。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagConfig {
    flags: HashMap<String, Flag>,
}

impl FlagConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// 以 `flag.key` 为 key 加入开关
    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flags.insert(flag.key.clone(), flag);
        self
    }

    /// 以指定 key 加入开关
    pub fn insert(&mut self, key: impl Into<String>, flag: Flag) -> Option<Flag> {
        self.flags.insert(key.into(), flag)
    }

    pub fn get(&self, key: &str) -> Option<&Flag> {
        self.flags.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.flags.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.flags.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Flag)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// 检查可疑配置，只报告不拒绝
    pub fn lint(&self) -> Vec<ConfigWarning> {
        ConfigValidator::lint(self)
    }
}

/// 评估原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Default,
    RuleMatch,
    Rollout,
    RolloutExcluded,
    FlagNotFound,
    Error,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::RuleMatch => "rule_match",
            Self::Rollout => "rollout",
            Self::RolloutExcluded => "rollout_excluded",
            Self::FlagNotFound => "flag_not_found",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 评估元数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 评估结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult<T> {
    pub value: T,
    pub reason: Reason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EvaluationMetadata>,
}

impl<T> EvaluationResult<T> {
    /// 未命中任何规则，返回开关默认值
    pub fn fallback(value: T) -> Self {
        Self {
            value,
            reason: Reason::Default,
            metadata: None,
        }
    }

    pub fn not_found(value: T, flag_key: &str) -> Self {
        Self {
            value,
            reason: Reason::FlagNotFound,
            metadata: Some(EvaluationMetadata {
                error: Some(format!("{} not found", flag_key)),
                ..Default::default()
            }),
        }
    }

    pub fn matched(value: T, reason: Reason, rule_index: usize, bucket: Option<u8>) -> Self {
        Self {
            value,
            reason,
            metadata: Some(EvaluationMetadata {
                rule_index: Some(rule_index),
                bucket,
                error: None,
            }),
        }
    }

    pub fn failed(value: T, message: impl Into<String>) -> Self {
        Self {
            value,
            reason: Reason::Error,
            metadata: Some(EvaluationMetadata {
                error: Some(message.into()),
                ..Default::default()
            }),
        }
    }

    pub fn rule_index(&self) -> Option<usize> {
        self.metadata.as_ref().and_then(|m| m.rule_index)
    }

    pub fn bucket(&self) -> Option<u8> {
        self.metadata.as_ref().and_then(|m| m.bucket)
    }

    pub fn error(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.error.as_deref())
    }
}

/// 按开关类型区分的评估结果，用于批量评估
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlagEvaluation {
    Bool(EvaluationResult<bool>),
    Variant(EvaluationResult<String>),
}

impl FlagEvaluation {
    pub fn reason(&self) -> Reason {
        match self {
            Self::Bool(r) => r.reason,
            Self::Variant(r) => r.reason,
        }
    }
}
