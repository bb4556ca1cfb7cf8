use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 训练/评估样本：一个固定长度的归一化窗口及其紧随其后的目标值。
///
/// # Invariants
/// - `window.len()` 等于生成时使用的窗口长度 W。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub window: Vec<f64>,
    pub target: f64,
}

/// # Summary
/// 一次预测与真实观测的对账记录，价格均为反归一化后的原始尺度。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    // 被预测的 K 线开始时间
    pub target_time: DateTime<Utc>,
    // 预测时已知的最后收盘价
    pub last_close: f64,
    // 预测价
    pub predicted: f64,
    // 真实收盘价
    pub actual: f64,
    // 预测价 - 真实价
    pub abs_error: f64,
    // 相对误差（百分比）
    pub pct_error: f64,
}

impl Reconciliation {
    /// 由预测值与真实值生成对账记录，真实值为 0 时相对误差记为 0。
    pub fn new(target_time: DateTime<Utc>, last_close: f64, predicted: f64, actual: f64) -> Self {
        let abs_error = predicted - actual;
        let pct_error = if actual != 0.0 {
            abs_error / actual * 100.0
        } else {
            0.0
        };
        Self {
            target_time,
            last_close,
            predicted,
            actual,
            abs_error,
            pct_error,
        }
    }
}

/// # Summary
/// 一组 (预测, 真实) 数据对的误差汇总。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub count: usize,
    pub mae: f64,
    pub rmse: f64,
    // 平均绝对百分比误差，跳过真实值为 0 的点
    pub mape: f64,
}

impl ErrorSummary {
    /// # Summary
    /// 汇总 (预测, 真实) 数据对的误差指标。
    ///
    /// # Logic
    /// 1. 累加绝对误差、平方误差与百分比误差。
    /// 2. 空输入返回全零汇总。
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut count = 0usize;
        let mut pct_count = 0usize;
        let (mut abs_sum, mut sq_sum, mut pct_sum) = (0.0, 0.0, 0.0);

        for (predicted, actual) in pairs {
            let err = predicted - actual;
            count += 1;
            abs_sum += err.abs();
            sq_sum += err * err;
            if actual != 0.0 {
                pct_count += 1;
                pct_sum += (err / actual).abs() * 100.0;
            }
        }

        if count == 0 {
            return Self::default();
        }

        Self {
            count,
            mae: abs_sum / count_f64(count),
            rmse: (sq_sum / count_f64(count)).sqrt(),
            mape: if pct_count == 0 {
                0.0
            } else {
                pct_sum / count_f64(pct_count)
            },
        }
    }

    pub fn from_records(records: &[Reconciliation]) -> Self {
        Self::from_pairs(records.iter().map(|r| (r.predicted, r.actual)))
    }
}

// 样本数远小于 2^52，转换无精度损失
#[allow(clippy::cast_precision_loss)]
fn count_f64(n: usize) -> f64 {
    n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_reconciliation_errors() {
        let t = Utc.with_ymd_and_hms(2025, 1, 1, 0, 1, 0).unwrap();
        let rec = Reconciliation::new(t, 2000.0, 2010.0, 2000.0);
        assert!((rec.abs_error - 10.0).abs() < 1e-9);
        assert!((rec.pct_error - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_error_summary() {
        let summary = ErrorSummary::from_pairs(vec![(11.0, 10.0), (8.0, 10.0)]);
        assert_eq!(summary.count, 2);
        assert!((summary.mae - 1.5).abs() < 1e-12);
        assert!((summary.rmse - (2.5f64).sqrt()).abs() < 1e-12);
        assert!((summary.mape - 15.0).abs() < 1e-12);

        assert_eq!(ErrorSummary::from_pairs(Vec::new()), ErrorSummary::default());
    }
}
