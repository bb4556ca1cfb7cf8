use thiserror::Error;

/// # Summary
/// 行情数据源错误枚举，处理网络、限流、解析及数据缺失等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
/// - 该域内所有错误对调用方而言都是暂时性的，重试策略由调用方决定。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 交易所限流 (HTTP 418/429)
    #[error("Rate limited: {0}")]
    RateLimited(String),
    // 数据解析错误，如 JSON 格式不匹配
    #[error("Parse error: {0}")]
    Parse(String),
    // 请求的数据未找到或尚未生成
    #[error("Data not found: {0}")]
    NotFound(String),
}
