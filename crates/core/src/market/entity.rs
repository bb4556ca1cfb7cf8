use crate::forecast::error::ForecastError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// # Summary
/// 单根 K 线数据实体，记录特定时段内的行情波动。
///
/// # Invariants
/// - `high` 必须大于或等于 `low`, `open`, `close`。
/// - `is_final` 为 true 表示 `time + 周期 <= 拉取时刻`，该 K 线已收盘。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // K 线开始时间
    pub time: DateTime<Utc>,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量
    pub volume: f64,
    // 是否为最终数据 (即该周期已收盘)
    pub is_final: bool,
}

/// # Summary
/// 单个观测点：某一时刻的收盘价。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// # Summary
/// 观测序列，按时间严格递增排列的观测点集合。
///
/// # Invariants
/// - 时间戳严格递增，不存在重复时间戳。
/// - 只能通过 `from_unsorted`（排序 + 去重，保留首次出现）或
///   `try_from_sorted`（校验）构造，之后不可变。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObservationSeries {
    points: Vec<Observation>,
}

impl ObservationSeries {
    /// # Summary
    /// 由任意顺序的观测点构造序列。
    ///
    /// # Logic
    /// 1. 按时间戳稳定排序，相同时间戳保持输入先后次序。
    /// 2. 去除重复时间戳，保留第一次出现的观测。
    ///
    /// # Arguments
    /// * `points`: 原始观测点，可能乱序、可能重复。
    ///
    /// # Returns
    /// 满足严格递增约束的序列。
    pub fn from_unsorted(mut points: Vec<Observation>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        points.dedup_by_key(|p| p.timestamp);
        Self { points }
    }

    /// # Summary
    /// 由已排序的观测点构造序列，违反严格递增约束时报错。
    ///
    /// # Returns
    /// 成功返回序列，乱序或重复返回 `ForecastError::InvalidArgument`。
    pub fn try_from_sorted(points: Vec<Observation>) -> Result<Self, ForecastError> {
        if let Some(pos) = points
            .windows(2)
            .position(|pair| pair[1].timestamp <= pair[0].timestamp)
        {
            return Err(ForecastError::InvalidArgument(format!(
                "observations are not strictly increasing at index {}",
                pos + 1
            )));
        }
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn as_slice(&self) -> &[Observation] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.points.iter()
    }

    pub fn first(&self) -> Option<&Observation> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.points.last()
    }

    /// 收盘价序列，顺序与观测一致。
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// # Summary
    /// 相邻收盘价的相对变化率。
    ///
    /// # Logic
    /// `delta[i] = (close[i] - close[i-1]) / close[i-1]`，首个元素没有前值，记为 0。
    pub fn deltas(&self) -> Vec<f64> {
        let mut deltas = Vec::with_capacity(self.points.len());
        let mut previous: Option<f64> = None;
        for point in &self.points {
            let delta = match previous {
                Some(prev) if prev != 0.0 => (point.close - prev) / prev,
                _ => 0.0,
            };
            deltas.push(delta);
            previous = Some(point.close);
        }
        deltas
    }

    /// 截取子区间，子区间天然满足递增约束。越界部分会被截断。
    pub fn slice(&self, range: Range<usize>) -> ObservationSeries {
        let end = range.end.min(self.points.len());
        let start = range.start.min(end);
        Self {
            points: self.points[start..end].to_vec(),
        }
    }
}
