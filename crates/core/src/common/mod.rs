pub mod time;

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// # Summary
/// 交易对实体，代表系统关注的特定加密资产行情。
///
/// # Invariants
/// - `symbol` 使用交易所原生写法 (例如: ETHUSDT)，不含分隔符。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    // 交易对代码 (例如: ETHUSDT)
    pub symbol: String,
    // 交易所代码 (可选，例如: BINANCE)
    pub exchange: Option<String>,
}

impl Pair {
    /// # Summary
    /// 由用户输入构造交易对，兼容 `ETH/USDT`、`eth-usdt` 等写法。
    pub fn new(symbol: &str) -> Self {
        let symbol = symbol
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_uppercase();
        Self {
            symbol,
            exchange: None,
        }
    }
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.exchange {
            Some(exchange) => write!(f, "{}:{}", exchange, self.symbol),
            None => write!(f, "{}", self.symbol),
        }
    }
}

/// # Summary
/// K 线时间周期枚举，定义单根 K 线的时间跨度。
///
/// # Invariants
/// - 序列化形式与交易所的 interval 写法一致 (`1m`, `5m`, `1h`, `1d`)。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimeFrame {
    // 1分钟
    #[serde(rename = "1m")]
    Minute1,
    // 5分钟
    #[serde(rename = "5m")]
    Minute5,
    // 1小时
    #[serde(rename = "1h")]
    Hour1,
    // 1日
    #[serde(rename = "1d")]
    Day1,
}

impl TimeFrame {
    /// 单根 K 线覆盖的时长。
    pub fn duration(&self) -> chrono::Duration {
        match self {
            TimeFrame::Minute1 => chrono::Duration::minutes(1),
            TimeFrame::Minute5 => chrono::Duration::minutes(5),
            TimeFrame::Hour1 => chrono::Duration::hours(1),
            TimeFrame::Day1 => chrono::Duration::days(1),
        }
    }
}

impl FromStr for TimeFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" | "minute1" => Ok(TimeFrame::Minute1),
            "5m" | "minute5" => Ok(TimeFrame::Minute5),
            "1h" | "hour1" => Ok(TimeFrame::Hour1),
            "1d" | "day1" => Ok(TimeFrame::Day1),
            _ => Err(format!("Unknown TimeFrame: {}", s)),
        }
    }
}

impl std::fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeFrame::Minute1 => write!(f, "1m"),
            TimeFrame::Minute5 => write!(f, "5m"),
            TimeFrame::Hour1 => write!(f, "1h"),
            TimeFrame::Day1 => write!(f, "1d"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_normalizes_symbol() {
        assert_eq!(Pair::new("ETH/USDT").symbol, "ETHUSDT");
        assert_eq!(Pair::new("eth-usdt").symbol, "ETHUSDT");
        assert_eq!(Pair::new("BTCUSDT").to_string(), "BTCUSDT");
    }

    #[test]
    fn test_timeframe_parse_and_duration() {
        let tf: TimeFrame = "1m".parse().unwrap();
        assert_eq!(tf, TimeFrame::Minute1);
        assert_eq!(tf.duration(), chrono::Duration::seconds(60));
        assert_eq!(TimeFrame::Hour1.to_string(), "1h");
        assert!("3m".parse::<TimeFrame>().is_err());
    }
}
