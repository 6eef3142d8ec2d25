//! 开关配置检查
//!
//! 安装配置前检查常见的编写错误。检查结果只用于告警，引擎仍按配置原样评估。

use crate::models::{Flag, FlagConfig, Rule};
use crate::operators::Operator;
use std::fmt;

/// 配置告警
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// 映射中的 key 与 `flag.key` 不一致
    KeyMismatch { map_key: String, flag_key: String },
    /// 灰度百分比超出 0-100
    PercentageOutOfRange {
        flag_key: String,
        rule_index: usize,
        percentage: f64,
    },
    /// 规则同时设置了 `value` 和 `variant`
    AmbiguousRuleValue { flag_key: String, rule_index: usize },
    /// 规则引用的变体不在目录中
    UnknownVariant {
        flag_key: String,
        rule_index: usize,
        variant: String,
    },
    /// 条件使用了无法识别的操作符
    UnknownOperator {
        flag_key: String,
        rule_index: usize,
        attribute: String,
    },
    /// 变体型开关的规则设置了布尔值
    BooleanRuleOnVariantFlag { flag_key: String, rule_index: usize },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyMismatch { map_key, flag_key } => {
                write!(f, "开关 '{}' 的 key 字段为 '{}'", map_key, flag_key)
            }
            Self::PercentageOutOfRange {
                flag_key,
                rule_index,
                percentage,
            } => write!(
                f,
                "开关 '{}' 规则 #{} 的百分比 {} 超出 0-100",
                flag_key, rule_index, percentage
            ),
            Self::AmbiguousRuleValue {
                flag_key,
                rule_index,
            } => write!(
                f,
                "开关 '{}' 规则 #{} 同时设置了 value 和 variant",
                flag_key, rule_index
            ),
            Self::UnknownVariant {
                flag_key,
                rule_index,
                variant,
            } => write!(
                f,
                "开关 '{}' 规则 #{} 引用的变体 '{}' 不在目录中",
                flag_key, rule_index, variant
            ),
            Self::UnknownOperator {
                flag_key,
                rule_index,
                attribute,
            } => write!(
                f,
                "开关 '{}' 规则 #{} 中属性 '{}' 的操作符无法识别，条件永不匹配",
                flag_key, rule_index, attribute
            ),
            Self::BooleanRuleOnVariantFlag {
                flag_key,
                rule_index,
            } => write!(
                f,
                "变体型开关 '{}' 规则 #{} 设置了布尔值",
                flag_key, rule_index
            ),
        }
    }
}

/// 配置检查器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 检查整份配置，按开关 key 排序输出
    pub fn lint(config: &FlagConfig) -> Vec<ConfigWarning> {
        let mut entries: Vec<_> = config.iter().collect();
        entries.sort_by_key(|(key, _)| *key);

        let mut warnings = Vec::new();
        for (map_key, flag) in entries {
            if map_key != flag.key {
                warnings.push(ConfigWarning::KeyMismatch {
                    map_key: map_key.to_string(),
                    flag_key: flag.key.clone(),
                });
            }

            for (index, rule) in flag.rules.iter().enumerate() {
                Self::lint_rule(map_key, flag, index, rule, &mut warnings);
            }
        }

        warnings
    }

    fn lint_rule(
        flag_key: &str,
        flag: &Flag,
        rule_index: usize,
        rule: &Rule,
        warnings: &mut Vec<ConfigWarning>,
    ) {
        if let Some(percentage) = rule.percentage {
            if !(0.0..=100.0).contains(&percentage) {
                warnings.push(ConfigWarning::PercentageOutOfRange {
                    flag_key: flag_key.to_string(),
                    rule_index,
                    percentage,
                });
            }
        }

        if rule.value.is_some() && rule.variant.is_some() {
            warnings.push(ConfigWarning::AmbiguousRuleValue {
                flag_key: flag_key.to_string(),
                rule_index,
            });
        }

        if let Some(variant) = &rule.variant {
            if !flag.variants.is_empty() && flag.find_variant(variant).is_none() {
                warnings.push(ConfigWarning::UnknownVariant {
                    flag_key: flag_key.to_string(),
                    rule_index,
                    variant: variant.clone(),
                });
            }
        }

        if rule.value.is_some() && !flag.is_boolean() {
            warnings.push(ConfigWarning::BooleanRuleOnVariantFlag {
                flag_key: flag_key.to_string(),
                rule_index,
            });
        }

        for condition in &rule.conditions {
            if condition.operator == Operator::Unknown {
                warnings.push(ConfigWarning::UnknownOperator {
                    flag_key: flag_key.to_string(),
                    rule_index,
                    attribute: condition.attribute.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Condition, Variant};

    #[test]
    fn test_clean_config_has_no_warnings() {
        let config = FlagConfig::new()
            .with_flag(
                Flag::boolean("beta", false).with_rule(
                    Rule::new()
                        .with_condition(Condition::new("plan", Operator::Eq, "premium"))
                        .with_percentage(50.0)
                        .with_value(true),
                ),
            )
            .with_flag(
                Flag::variant("color", "control")
                    .with_variant(Variant::new("control"))
                    .with_variant(Variant::new("red"))
                    .with_rule(Rule::new().with_variant("red")),
            );

        assert!(config.lint().is_empty());
    }

    #[test]
    fn test_reports_suspicious_rules() {
        let mut config = FlagConfig::new().with_flag(
            Flag::variant("color", "control")
                .with_variant(Variant::new("control"))
                .with_rule(Rule::new().with_percentage(150.0).with_variant("blue"))
                .with_rule(
                    Rule::new()
                        .with_value(true)
                        .with_variant("control")
                        .with_condition(Condition::new("country", Operator::Unknown, "US")),
                ),
        );
        config.insert("alias", Flag::boolean("original", true));

        let warnings = config.lint();

        assert_eq!(
            warnings,
            vec![
                ConfigWarning::KeyMismatch {
                    map_key: "alias".to_string(),
                    flag_key: "original".to_string(),
                },
                ConfigWarning::PercentageOutOfRange {
                    flag_key: "color".to_string(),
                    rule_index: 0,
                    percentage: 150.0,
                },
                ConfigWarning::UnknownVariant {
                    flag_key: "color".to_string(),
                    rule_index: 0,
                    variant: "blue".to_string(),
                },
                ConfigWarning::AmbiguousRuleValue {
                    flag_key: "color".to_string(),
                    rule_index: 1,
                },
                ConfigWarning::BooleanRuleOnVariantFlag {
                    flag_key: "color".to_string(),
                    rule_index: 1,
                },
                ConfigWarning::UnknownOperator {
                    flag_key: "color".to_string(),
                    rule_index: 1,
                    attribute: "country".to_string(),
                },
            ]
        );
        assert!(warnings[1].to_string().contains("150"));
    }
}
