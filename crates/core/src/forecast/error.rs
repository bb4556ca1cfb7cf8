use crate::market::error::MarketError;
use thiserror::Error;

/// # Summary
/// 预测域错误枚举。
///
/// # Invariants
/// - `InvalidArgument` 与 `InsufficientData` 属于调用或配置错误，必须立即向上传播。
/// - `SourceUnavailable` 是暂时性故障，实时会话内部负责记录日志并退避重试。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    // 参数非法，如窗口长度为 0
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    // 可用观测不足以构成一个窗口
    #[error("Insufficient data: need {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },
    // 上游行情数据源暂不可用
    #[error("Source unavailable: {0}")]
    SourceUnavailable(#[from] MarketError),
    // 预测器内部错误
    #[error("Predictor error: {0}")]
    Predictor(String),
}

impl ForecastError {
    /// 是否属于可通过退避重试恢复的暂时性错误。
    pub fn is_transient(&self) -> bool {
        matches!(self, ForecastError::SourceUnavailable(_))
    }
}
