use async_trait::async_trait;
use candlecast_core::common::{Pair, TimeFrame};
use candlecast_core::market::entity::Candle;
use candlecast_core::market::error::MarketError;
use candlecast_core::market::port::ObservationSource;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Binance 公共行情接口默认地址
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// 单次 klines 请求允许的最大条数
const MAX_LIMIT: usize = 1000;

/// # Summary
/// Binance 现货 K 线数据源实现。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯，只访问无需鉴权的公共接口。
/// - 不做重试，所有失败以 `MarketError` 返回给调用方。
#[derive(Clone)]
pub struct BinanceProvider {
    /// 内部使用的 HTTP 客户端
    client: Client,
    /// 接口根地址，测试时可替换
    base_url: String,
}

impl BinanceProvider {
    /// # Summary
    /// 创建一个新的 BinanceProvider 实例。
    ///
    /// # Logic
    /// 1. 配置请求超时。
    /// 2. 初始化 reqwest 客户端。
    ///
    /// # Arguments
    /// * `base_url`: 接口根地址，例如 `https://api.binance.com`。
    /// * `timeout`: 单次请求超时。
    ///
    /// # Returns
    /// 成功返回 BinanceProvider，客户端构建失败返回 `MarketError::Network`。
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MarketError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// # Summary
/// Binance 接口错误响应体。
#[derive(Deserialize, Debug)]
struct BinanceError {
    code: i64,
    msg: String,
}

/// # Summary
/// 将非 2xx 响应映射为行情错误。
///
/// # Logic
/// 1. 418/429 为限流（418 表示因持续超限被临时封禁）。
/// 2. 其余状态归为网络错误，能解析错误体时带上 Binance 错误码与说明。
fn status_error(status: StatusCode, body: Option<BinanceError>) -> MarketError {
    let detail = match body {
        Some(err) => format!("HTTP {} (code {}): {}", status, err.code, err.msg),
        None => format!("HTTP {}", status),
    };
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
        MarketError::RateLimited(detail)
    } else {
        MarketError::Network(detail)
    }
}

/// 映射 TimeFrame 周期为 Binance 识别的 interval。
fn interval(timeframe: TimeFrame) -> &'static str {
    match timeframe {
        TimeFrame::Minute1 => "1m",
        TimeFrame::Minute5 => "5m",
        TimeFrame::Hour1 => "1h",
        TimeFrame::Day1 => "1d",
    }
}

/// # Summary
/// 解析 klines 接口返回的二维数组。
///
/// # Logic
/// 1. 每行格式为 `[开盘时间ms, "open", "high", "low", "close", "volume", 收盘时间ms, ...]`。
/// 2. 价格字段为字符串，需要逐个解析为 f64。
/// 3. 收盘时间早于 `now` 的 K 线标记为 is_final。
///
/// # Arguments
/// * `rows`: 原始 JSON 行。
/// * `now`: 判定收盘状态所用的当前时刻。
///
/// # Returns
/// 按开盘时间升序的 K 线列表，任一行格式非法则返回 `MarketError::Parse`。
pub(crate) fn parse_klines(
    rows: &[Vec<Value>],
    now: DateTime<Utc>,
) -> Result<Vec<Candle>, MarketError> {
    let mut candles = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        if row.len() < 7 {
            return Err(MarketError::Parse(format!(
                "kline row {} has {} fields",
                i,
                row.len()
            )));
        }

        let millis = |idx: usize| -> Result<DateTime<Utc>, MarketError> {
            row[idx]
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .ok_or_else(|| {
                    MarketError::Parse(format!("kline row {} field {} is not a timestamp", i, idx))
                })
        };
        let price = |idx: usize| -> Result<f64, MarketError> {
            match &row[idx] {
                Value::String(s) => s.parse::<f64>().ok(),
                Value::Number(n) => n.as_f64(),
                _ => None,
            }
            .ok_or_else(|| {
                MarketError::Parse(format!("kline row {} field {} is not a number", i, idx))
            })
        };

        let close_time = millis(6)?;
        candles.push(Candle {
            time: millis(0)?,
            open: price(1)?,
            high: price(2)?,
            low: price(3)?,
            close: price(4)?,
            volume: price(5)?,
            is_final: close_time < now,
        });
    }

    candles.sort_by_key(|c| c.time);
    Ok(candles)
}

#[async_trait]
impl ObservationSource for BinanceProvider {
    /// # Summary
    /// 从 Binance 抓取最近的 K 线。
    ///
    /// # Logic
    /// 1. 将数量限制在接口上限内。
    /// 2. 请求 `/api/v3/klines`。
    /// 3. 418/429 映射为限流错误，其余非 2xx 尽量解析错误体。
    /// 4. 解析数组并标记收盘状态。
    ///
    /// # Arguments
    /// * `pair`: 交易对。
    /// * `timeframe`: 周期。
    /// * `count`: K 线数量。
    ///
    /// # Returns
    /// 成功返回 K 线列表，失败返回 MarketError。
    async fn fetch_latest(
        &self,
        pair: &Pair,
        timeframe: TimeFrame,
        count: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        let limit = count.clamp(1, MAX_LIMIT);
        let url = format!("{}/api/v3/klines", self.base_url);
        debug!("Fetching {} {} klines for {}", limit, timeframe, pair);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("symbol", pair.symbol.as_str()),
                ("interval", interval(timeframe)),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.json::<BinanceError>().await.ok();
            return Err(status_error(status, body));
        }

        let rows: Vec<Vec<Value>> = resp
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;

        parse_klines(&rows, Utc::now())
    }
}
