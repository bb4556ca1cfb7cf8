use crate::common::{Pair, TimeFrame};
use crate::market::entity::Candle;
use crate::market::error::MarketError;
use async_trait::async_trait;

/// # Summary
/// 行情观测数据源接口（原始数据提供者）。
///
/// # Invariants
/// - 返回的 K 线按时间升序排列，最新的一根在最后。
/// - 实现者不做重试，退避策略由调用方（实时会话）负责。
#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// # Summary
    /// 获取指定交易对最近 `count` 根 K 线。
    ///
    /// # Logic
    /// 1. 构建数据源请求。
    /// 2. 执行网络请求并解析响应数据。
    /// 3. 依据当前时间标记每根 K 线是否已收盘。
    ///
    /// # Arguments
    /// * `pair`: 交易对。
    /// * `timeframe`: K 线周期。
    /// * `count`: 需要的 K 线数量（包含尚未收盘的最新一根）。
    ///
    /// # Returns
    /// 成功返回按时间升序的 K 线列表，失败返回 `MarketError`。
    async fn fetch_latest(
        &self,
        pair: &Pair,
        timeframe: TimeFrame,
        count: usize,
    ) -> Result<Vec<Candle>, MarketError>;
}
