//! 开关评估器
//!
//! 持有一份不可变的配置快照，按声明顺序遍历开关的规则，第一条完全匹配的规则胜出。
//! 评估从不返回错误：开关缺失、条件不符、缺少用户标识都体现在 `reason` 中。

use crate::matcher::ConditionMatcher;
use crate::models::{Context, EvaluationResult, Flag, FlagConfig, FlagEvaluation, Reason, Rule};
use crate::rollout;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, trace};

/// 变体型评估在开关缺失时返回的值
pub const MISSING_VARIANT: &str = "default";

/// 单条规则的评估结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleOutcome {
    Matched { reason: Reason, bucket: Option<u8> },
    Skipped(NoMatch),
}

/// 规则未命中的原因
///
/// 对外统一表现为 `rollout_excluded` 后继续下一条规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoMatch {
    ConditionsFailed,
    MissingUserId,
    RolloutExcluded { bucket: u8 },
}

/// 命中的规则
struct RuleMatch<'a> {
    index: usize,
    rule: &'a Rule,
    reason: Reason,
    bucket: Option<u8>,
}

/// 开关评估器
///
/// 构造后不再修改，可被任意多个线程同时读取。替换配置需要构造新的评估器。
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: FlagConfig,
}

impl Evaluator {
    pub fn new(config: FlagConfig) -> Self {
        Self { config }
    }

    /// 评估布尔型开关
    pub fn eval_bool(&self, flag_key: &str, context: &Context) -> EvaluationResult<bool> {
        let result = match self.config.get(flag_key) {
            None => EvaluationResult::not_found(false, flag_key),
            Some(flag) => {
                Self::guarded(flag_key, || Self::resolve_bool(flag, flag_key, context))
                    .unwrap_or_else(|message| {
                        EvaluationResult::failed(flag.default_value.is_truthy(), message)
                    })
            }
        };

        record("bool", result.reason);
        result
    }

    /// 评估变体型开关
    pub fn eval_variant(&self, flag_key: &str, context: &Context) -> EvaluationResult<String> {
        let result = match self.config.get(flag_key) {
            None => EvaluationResult::not_found(MISSING_VARIANT.to_string(), flag_key),
            Some(flag) => {
                Self::guarded(flag_key, || Self::resolve_variant(flag, flag_key, context))
                    .unwrap_or_else(|message| {
                        EvaluationResult::failed(flag.default_value.to_string(), message)
                    })
            }
        };

        record("variant", result.reason);
        result
    }

    /// 按开关默认值类型评估快照中的所有开关
    pub fn evaluate_all(&self, context: &Context) -> BTreeMap<String, FlagEvaluation> {
        self.config
            .iter()
            .map(|(key, flag)| {
                let evaluation = if flag.is_boolean() {
                    FlagEvaluation::Bool(self.eval_bool(key, context))
                } else {
                    FlagEvaluation::Variant(self.eval_variant(key, context))
                };
                (key.to_string(), evaluation)
            })
            .collect()
    }

    /// 查询变体目录中的负载
    pub fn variant_payload(&self, flag_key: &str, variant: &str) -> Option<&serde_json::Value> {
        self.config
            .get(flag_key)?
            .find_variant(variant)?
            .payload
            .as_ref()
    }

    pub fn has_flag(&self, flag_key: &str) -> bool {
        self.config.contains(flag_key)
    }

    pub fn flag_keys(&self) -> Vec<&str> {
        self.config.keys().collect()
    }

    /// 返回持有的配置快照（只读）
    pub fn config(&self) -> &FlagConfig {
        &self.config
    }

    fn resolve_bool(flag: &Flag, flag_key: &str, context: &Context) -> EvaluationResult<bool> {
        match Self::first_match(flag, flag_key, context) {
            Some(m) => EvaluationResult::matched(
                m.rule.value.unwrap_or(true),
                m.reason,
                m.index,
                m.bucket,
            ),
            None => EvaluationResult::fallback(flag.default_value.is_truthy()),
        }
    }

    fn resolve_variant(flag: &Flag, flag_key: &str, context: &Context) -> EvaluationResult<String> {
        match Self::first_match(flag, flag_key, context) {
            Some(m) => EvaluationResult::matched(
                m.rule
                    .variant
                    .clone()
                    .unwrap_or_else(|| flag.default_value.to_string()),
                m.reason,
                m.index,
                m.bucket,
            ),
            None => EvaluationResult::fallback(flag.default_value.to_string()),
        }
    }

    /// 按声明顺序查找第一条命中的规则
    fn first_match<'a>(flag: &'a Flag, flag_key: &str, context: &Context) -> Option<RuleMatch<'a>> {
        flag.rules.iter().enumerate().find_map(|(index, rule)| {
            match Self::evaluate_rule(rule, flag_key, context) {
                RuleOutcome::Matched { reason, bucket } => Some(RuleMatch {
                    index,
                    rule,
                    reason,
                    bucket,
                }),
                RuleOutcome::Skipped(cause) => {
                    trace!(
                        flag_key,
                        rule_index = index,
                        reason = %Reason::RolloutExcluded,
                        ?cause,
                        "规则未命中"
                    );
                    None
                }
            }
        })
    }

    /// 评估单条规则：条件先于灰度
    fn evaluate_rule(rule: &Rule, flag_key: &str, context: &Context) -> RuleOutcome {
        if !ConditionMatcher::matches_all(&rule.conditions, context) {
            return RuleOutcome::Skipped(NoMatch::ConditionsFailed);
        }

        match rule.percentage {
            Some(percentage) if percentage < 100.0 => {
                let Some(user_id) = context.user_id() else {
                    return RuleOutcome::Skipped(NoMatch::MissingUserId);
                };

                let bucket = rollout::bucket(user_id, flag_key);
                if f64::from(bucket) <= percentage {
                    RuleOutcome::Matched {
                        reason: Reason::Rollout,
                        bucket: Some(bucket),
                    }
                } else {
                    RuleOutcome::Skipped(NoMatch::RolloutExcluded { bucket })
                }
            }
            _ => RuleOutcome::Matched {
                reason: Reason::RuleMatch,
                bucket: None,
            },
        }
    }

    /// 评估边界保护：捕获 panic 并转为错误信息，由调用方降级为默认值
    fn guarded<T>(
        flag_key: &str,
        evaluate: impl FnOnce() -> EvaluationResult<T>,
    ) -> Result<EvaluationResult<T>, String> {
        panic::catch_unwind(AssertUnwindSafe(evaluate)).map_err(|payload| {
            let message = panic_message(payload.as_ref());
            error!(flag_key, error = %message, "开关评估异常，返回默认值");
            format!("{} evaluation failed: {}", flag_key, message)
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn record(kind: &'static str, reason: Reason) {
    metrics::counter!("flag_evaluations_total", "kind" => kind, "reason" => reason.as_str())
        .increment(1);
}
