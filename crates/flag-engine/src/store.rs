//! 开关配置快照管理
//!
//! `FlagStore` 持有当前生效的评估器。读取只是一次原子 load，
//! 替换配置时整体换入新的评估器，正在进行的评估继续使用旧快照直到结束。

use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::models::{Context, EvaluationResult, FlagConfig, FlagEvaluation};
use crate::source::FlagSource;
use arc_swap::ArcSwap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

/// 线程安全的评估器快照容器
#[derive(Clone)]
pub struct FlagStore {
    /// 当前快照，读取端无锁
    current: Arc<ArcSwap<Evaluator>>,
    tx: watch::Sender<Arc<Evaluator>>,
    rx: watch::Receiver<Arc<Evaluator>>,
}

impl FlagStore {
    /// 用初始配置创建
    pub fn new(config: FlagConfig) -> Self {
        let evaluator = Arc::new(Self::build(config));
        let (tx, rx) = watch::channel(evaluator.clone());
        Self {
            current: Arc::new(ArcSwap::from(evaluator)),
            tx,
            rx,
        }
    }

    /// 从配置来源拉取一次初始配置
    pub async fn from_source(source: &dyn FlagSource) -> Result<Self> {
        let config = source.fetch().await?;
        Ok(Self::new(config))
    }

    /// 获取当前快照
    pub fn load(&self) -> Arc<Evaluator> {
        self.current.load_full()
    }

    pub fn eval_bool(&self, flag_key: &str, context: &Context) -> EvaluationResult<bool> {
        self.current.load().eval_bool(flag_key, context)
    }

    pub fn eval_variant(&self, flag_key: &str, context: &Context) -> EvaluationResult<String> {
        self.current.load().eval_variant(flag_key, context)
    }

    pub fn evaluate_all(&self, context: &Context) -> BTreeMap<String, FlagEvaluation> {
        self.current.load().evaluate_all(context)
    }

    /// 订阅快照变更
    pub fn subscribe(&self) -> watch::Receiver<Arc<Evaluator>> {
        self.rx.clone()
    }

    /// 换入新配置
    ///
    /// 快照替换与通知都在 watch 通道的写锁内完成，并发替换时
    /// `load()` 与订阅方最终看到的是同一份快照。
    #[instrument(skip(self, config), fields(flags = config.len()))]
    pub fn replace(&self, config: FlagConfig) {
        let evaluator = Arc::new(Self::build(config));
        self.tx.send_modify(|latest| {
            self.current.store(evaluator.clone());
            *latest = evaluator;
        });
    }

    /// 从配置来源拉取并换入，失败时保留当前快照
    #[instrument(skip(self, source))]
    pub async fn refresh_from(&self, source: &dyn FlagSource) -> Result<usize> {
        match source.fetch().await {
            Ok(config) => {
                let count = config.len();
                self.replace(config);
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "刷新开关配置失败，保留当前配置");
                Err(e)
            }
        }
    }

    fn build(config: FlagConfig) -> Evaluator {
        for warning in config.lint() {
            warn!("{}", warning);
        }
        info!("开关配置已加载: {} 个开关", config.len());
        Evaluator::new(config)
    }
}

impl Default for FlagStore {
    fn default() -> Self {
        Self::new(FlagConfig::default())
    }
}
