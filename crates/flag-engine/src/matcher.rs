//! 条件匹配器
//!
//! 对单个条件在上下文上求值。所有类型不符、属性缺失的情况都归结为"不匹配"，
//! 从不返回错误。

use crate::models::{Condition, Context};
use crate::operators::Operator;
use crate::value::AttributeValue;

/// 条件匹配器
pub struct ConditionMatcher;

impl ConditionMatcher {
    /// 评估单个条件
    pub fn matches(condition: &Condition, context: &Context) -> bool {
        let expected = condition.value.as_ref();

        // 属性缺失时只有 neq 可能匹配：缺失视为"不同于任何已定义的值"
        let Some(actual) = context.resolve(&condition.attribute) else {
            return condition.operator == Operator::Neq && expected.is_some();
        };

        match condition.operator {
            Operator::Eq => Self::loose_eq(Some(actual), expected),
            Operator::Neq => !Self::loose_eq(Some(actual), expected),
            Operator::In => Self::in_set(actual, expected),
            Operator::Gt => Self::compare(actual, expected, |a, b| a > b),
            Operator::Gte => Self::compare(actual, expected, |a, b| a >= b),
            Operator::Lt => Self::compare(actual, expected, |a, b| a < b),
            Operator::Lte => Self::compare(actual, expected, |a, b| a <= b),
            Operator::Contains => Self::contains(actual, expected),
            Operator::Unknown => false,
        }
    }

    /// 所有条件都匹配时返回 true，空列表恒为 true
    pub fn matches_all(conditions: &[Condition], context: &Context) -> bool {
        conditions.iter().all(|c| Self::matches(c, context))
    }

    /// 宽松相等
    ///
    /// 三级比较：完全相同直接相等；任一侧为空值（null 或未定义）时仅当两侧都为空值才相等；
    /// 否则比较两侧的字符串表示，因此数字 `25` 与字符串 `"25"` 相等。
    pub fn loose_eq(a: Option<&AttributeValue>, b: Option<&AttributeValue>) -> bool {
        if let (Some(a), Some(b)) = (a, b) {
            if a == b {
                return true;
            }
        }

        let a_nullish = a.is_none_or(AttributeValue::is_null);
        let b_nullish = b.is_none_or(AttributeValue::is_null);

        match (a, b) {
            (Some(a), Some(b)) if !a_nullish && !b_nullish => a.to_string() == b.to_string(),
            _ => a_nullish && b_nullish,
        }
    }

    /// 集合包含检查 (in)，比较值必须是列表
    fn in_set(actual: &AttributeValue, expected: Option<&AttributeValue>) -> bool {
        match expected {
            Some(AttributeValue::List(items)) => {
                items.iter().any(|item| Self::loose_eq(Some(actual), Some(item)))
            }
            _ => false,
        }
    }

    /// 数值比较，任一侧无法转为数字时不匹配
    fn compare<F>(actual: &AttributeValue, expected: Option<&AttributeValue>, cmp: F) -> bool
    where
        F: Fn(f64, f64) -> bool,
    {
        match (actual.as_number(), expected.and_then(AttributeValue::as_number)) {
            (Some(a), Some(b)) => cmp(a, b),
            _ => false,
        }
    }

    /// 字符串子串 / 列表元素包含检查
    fn contains(actual: &AttributeValue, expected: Option<&AttributeValue>) -> bool {
        match actual {
            AttributeValue::String(s) => expected
                .and_then(AttributeValue::as_str)
                .is_some_and(|needle| s.contains(needle)),
            AttributeValue::List(items) => items
                .iter()
                .any(|item| Self::loose_eq(Some(item), expected)),
            _ => false,
        }
    }
}
