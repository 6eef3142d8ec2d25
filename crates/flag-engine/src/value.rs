//! 上下文属性值
//!
//! 属性可以是字符串、数字、布尔、列表或嵌套映射。比较时沿用动态类型运行时的
//! 宽松语义：字符串化后比较、字符串按前缀解析为浮点数。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// 属性值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<AttributeValue>),
    Map(HashMap<String, AttributeValue>),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// 数值强制转换
    ///
    /// 数字原样返回，字符串按浮点数前缀解析，其余类型与无法解析的字符串返回 `None`。
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Self::Number(n) => *n,
            Self::String(s) => parse_float_prefix(s)?,
            _ => return None,
        };
        (!n.is_nan()).then_some(n)
    }

    /// 获取值的类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

/// 字符串表示，用于宽松相等的最后一级比较
///
/// 与动态类型运行时的字符串化保持一致：`25` 与 `25.0` 都是 `"25"`，
/// 列表以逗号拼接（null 元素为空串），映射统一为 `[object Object]`。
impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::String(s) => f.write_str(s),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if !item.is_null() {
                        write!(f, "{}", item)?;
                    }
                }
                Ok(())
            }
            Self::Map(_) => f.write_str("[object Object]"),
        }
    }
}

/// 数字格式化
///
/// [1e-6, 1e21) 区间内使用定点表示，整数不带小数部分；区间外使用 `1e+21` 形式的指数表示。
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{}", n);
    }

    let exp = format!("{:e}", n);
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => format!("{}e+{}", mantissa, power),
        _ => exp,
    }
}

/// 按浮点数前缀解析字符串
///
/// 跳过前导空白，取最长的合法数字前缀（`"25px"` 解析为 25），没有数字前缀时返回 `None`。
pub(crate) fn parse_float_prefix(input: &str) -> Option<f64> {
    let s = input.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    if s[end..].starts_with("Infinity") {
        return Some(if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        });
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    // 指数部分只有在后面跟着数字时才计入
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    s[..end].parse().ok()
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl<T: Into<AttributeValue>> From<Vec<T>> for AttributeValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<HashMap<String, AttributeValue>> for AttributeValue {
    fn from(map: HashMap<String, AttributeValue>) -> Self {
        Self::Map(map)
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_shapes() {
        let value: AttributeValue = serde_json::from_value(json!({
            "plan": "premium",
            "age": 25,
            "beta": true,
            "tags": ["a", null],
            "missing": null
        }))
        .unwrap();

        let AttributeValue::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(map["plan"], AttributeValue::from("premium"));
        assert_eq!(map["age"], AttributeValue::Number(25.0));
        assert_eq!(map["beta"], AttributeValue::Bool(true));
        assert_eq!(
            map["tags"],
            AttributeValue::List(vec![AttributeValue::from("a"), AttributeValue::Null])
        );
        assert!(map["missing"].is_null());
    }

    #[test]
    fn test_display_numbers() {
        assert_eq!(AttributeValue::from(25).to_string(), "25");
        assert_eq!(AttributeValue::Number(25.0).to_string(), "25");
        assert_eq!(AttributeValue::Number(1.5).to_string(), "1.5");
        assert_eq!(AttributeValue::Number(-0.0).to_string(), "0");
        assert_eq!(AttributeValue::Number(1e21).to_string(), "1e+21");
        assert_eq!(AttributeValue::Number(1e-7).to_string(), "1e-7");
        assert_eq!(AttributeValue::Number(f64::INFINITY).to_string(), "Infinity");
    }

    #[test]
    fn test_display_composites() {
        assert_eq!(AttributeValue::Bool(true).to_string(), "true");
        assert_eq!(AttributeValue::Null.to_string(), "null");
        assert_eq!(
            AttributeValue::from(vec![
                AttributeValue::from(1),
                AttributeValue::Null,
                AttributeValue::from("x")
            ])
            .to_string(),
            "1,,x"
        );
        assert_eq!(
            AttributeValue::from(json!({"a": 1})).to_string(),
            "[object Object]"
        );
    }

    #[test]
    fn test_as_number() {
        assert_eq!(AttributeValue::from(42).as_number(), Some(42.0));
        assert_eq!(AttributeValue::from("3.5").as_number(), Some(3.5));
        assert_eq!(AttributeValue::from("  18 years").as_number(), Some(18.0));
        assert_eq!(AttributeValue::from("1e3").as_number(), Some(1000.0));
        assert_eq!(AttributeValue::from("abc").as_number(), None);
        assert_eq!(AttributeValue::from("").as_number(), None);
        assert_eq!(AttributeValue::Bool(true).as_number(), None);
        assert_eq!(AttributeValue::Null.as_number(), None);
    }

    #[test]
    fn test_parse_float_prefix_edges() {
        assert_eq!(parse_float_prefix(".5"), Some(0.5));
        assert_eq!(parse_float_prefix("5."), Some(5.0));
        assert_eq!(parse_float_prefix("-7e"), Some(-7.0));
        assert_eq!(parse_float_prefix("2e+2x"), Some(200.0));
        assert_eq!(parse_float_prefix("-Infinity"), Some(f64::NEG_INFINITY));
        assert_eq!(parse_float_prefix("."), None);
        assert_eq!(parse_float_prefix("-"), None);
        assert_eq!(parse_float_prefix("inf"), None);
    }
}
