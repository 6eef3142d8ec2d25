//! 功能开关评估引擎
//!
//! 根据开关配置和用户上下文，确定性地计算开关的取值：
//! - 按声明顺序评估定向规则，第一条命中的规则胜出
//! - 基于 `userId` 与开关 key 的稳定哈希进行百分比灰度
//! - 通过原子快照替换支持配置热更新
//!
//! 评估从不失败，所有异常情况都以 `reason` 的形式返回。

pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod models;
pub mod operators;
pub mod request;
pub mod rollout;
pub mod source;
pub mod store;
pub mod validator;
pub mod value;

pub use error::{FlagError, Result};
pub use evaluator::Evaluator;
pub use matcher::ConditionMatcher;
pub use models::{
    Condition, Context, EvaluationMetadata, EvaluationResult, Flag, FlagConfig, FlagEvaluation,
    FlagValue, Reason, Rule, Variant,
};
pub use operators::Operator;
pub use source::{FileFlagSource, FlagSource};
pub use store::FlagStore;
pub use validator::{ConfigValidator, ConfigWarning};
pub use value::AttributeValue;
