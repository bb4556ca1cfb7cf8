use crate::common::TimeFrame;
use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub feed: FeedConfig,
    pub forecast: ForecastConfig,
    pub live: LiveConfig,
    pub train: TrainConfig,
    pub split: SplitConfig,
}

/// 数据文件布局，相对路径均以 `dir` 为根。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: String,
    pub cleaned_file: String,
    pub train_file: String,
    pub validation_file: String,
    pub test_file: String,
    pub model_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    // 模型输入窗口长度 W
    pub look_back: usize,
    // 自回归预测步数 H
    pub horizon: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    // 会话总时长（分钟）
    pub session_minutes: i64,
    // 拉取失败后的固定退避（秒）
    pub retry_backoff_secs: i64,
    // K 线收盘后额外等待交易所落盘的时间（秒）
    pub settle_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    // 验证集损失连续无改善的容忍轮数
    pub patience: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub train_ratio: f64,
    pub validation_ratio: f64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: "data".to_string(),
            cleaned_file: "close_and_delta.csv".to_string(),
            train_file: "train.csv".to_string(),
            validation_file: "validation.csv".to_string(),
            test_file: "test.csv".to_string(),
            model_file: "model.json".to_string(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".to_string(),
            symbol: "ETHUSDT".to_string(),
            timeframe: TimeFrame::Minute1,
            timeout_secs: 10,
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            look_back: 30,
            horizon: 10,
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            session_minutes: 10,
            retry_backoff_secs: 60,
            settle_secs: 2,
        }
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 128,
            learning_rate: 0.05,
            patience: 10,
            seed: 42,
        }
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.8,
            validation_ratio: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.data.dir, "data");
        assert_eq!(config.feed.symbol, "ETHUSDT");
        assert_eq!(config.feed.timeframe, TimeFrame::Minute1);
        assert_eq!(config.forecast.look_back, 30);
        assert_eq!(config.forecast.horizon, 10);
        assert_eq!(config.live.session_minutes, 10);
        assert_eq!(config.live.retry_backoff_secs, 60);
        assert_eq!(config.train.batch_size, 128);
        assert!((config.split.train_ratio - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"feed": {"symbol": "BTCUSDT", "timeframe": "5m"}}"#).unwrap();
        assert_eq!(config.feed.symbol, "BTCUSDT");
        assert_eq!(config.feed.timeframe, TimeFrame::Minute5);
        assert_eq!(config.feed.timeout_secs, 10);
        assert_eq!(config.forecast.look_back, 30);
    }
}
