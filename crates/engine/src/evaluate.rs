use crate::window::windows;
use candlecast_core::forecast::entity::{ErrorSummary, Reconciliation};
use candlecast_core::forecast::error::ForecastError;
use candlecast_core::forecast::normalizer::Normalizer;
use candlecast_core::forecast::port::Predictor;
use candlecast_core::market::entity::ObservationSeries;
use tracing::info;

/// # Summary
/// 留出集上的逐点预测结果与误差汇总（价格尺度）。
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub points: Vec<Reconciliation>,
    pub summary: ErrorSummary,
}

/// # Summary
/// 在测试序列上评估单步预测器。
///
/// # Logic
/// 1. 用训练集拟合的归一化器变换测试序列（不重新拟合）。
/// 2. 切分窗口并逐个预测。
/// 3. 预测值反归一化后与原始收盘价比较，误差只在价格空间计算。
///
/// # Arguments
/// * `predictor`: 单步预测器。
/// * `normalizer`: 训练集上拟合的归一化器。
/// * `series`: 测试序列。
///
/// # Returns
/// 序列不足以构成任何样本时返回 `InsufficientData`。
pub fn evaluate(
    predictor: &dyn Predictor,
    normalizer: &Normalizer,
    series: &ObservationSeries,
) -> Result<Evaluation, ForecastError> {
    let w = predictor.window_size();
    let scaled = normalizer.transform_all(&series.closes());
    let samples = windows(&scaled, w)?;
    if samples.is_empty() {
        return Err(ForecastError::InsufficientData {
            needed: w.saturating_add(1),
            got: series.len(),
        });
    }

    let observations = series.as_slice();
    let mut points = Vec::with_capacity(samples.len());
    for (i, sample) in samples.iter().enumerate() {
        let predicted = normalizer.inverse(predictor.predict(&sample.window)?);
        let target = &observations[i + w];
        let last_close = observations[i + w - 1].close;
        points.push(Reconciliation::new(target.timestamp, last_close, predicted, target.close));
    }

    let summary = ErrorSummary::from_records(&points);
    info!(
        "Evaluated {} samples: RMSE {:.4}, MAE {:.4}, MAPE {:.4}%",
        summary.count, summary.rmse, summary.mae, summary.mape
    );
    Ok(Evaluation { points, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlecast_core::market::entity::Observation;
    use candlecast_core::testing::LastValuePredictor;
    use chrono::{TimeZone, Utc};

    fn series(closes: &[f64]) -> ObservationSeries {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        ObservationSeries::from_unsorted(
            closes
                .iter()
                .zip(0i64..)
                .map(|(c, i)| Observation {
                    timestamp: base + chrono::Duration::minutes(i),
                    close: *c,
                })
                .collect(),
        )
    }

    #[test]
    fn test_evaluate_in_price_space() {
        let normalizer = Normalizer::fit(&[100.0, 110.0]).unwrap();
        let predictor = LastValuePredictor { window: 2 };
        let test = series(&[100.0, 102.0, 104.0, 103.0]);

        let eval = evaluate(&predictor, &normalizer, &test).unwrap();

        assert_eq!(eval.points.len(), 2);
        assert!((eval.points[0].predicted - 102.0).abs() < 1e-9);
        assert_eq!(eval.points[0].actual, 104.0);
        assert!((eval.points[1].predicted - 104.0).abs() < 1e-9);
        assert_eq!(eval.points[1].actual, 103.0);
        // 误差 2 与 1
        assert!((eval.summary.mae - 1.5).abs() < 1e-9);
        assert!((eval.summary.rmse - (2.5f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_evaluate_too_short() {
        let normalizer = Normalizer::fit(&[1.0, 2.0]).unwrap();
        let predictor = LastValuePredictor { window: 3 };
        let err = evaluate(&predictor, &normalizer, &series(&[1.0, 2.0, 3.0])).unwrap_err();
        assert_eq!(err, ForecastError::InsufficientData { needed: 4, got: 3 });
    }
}
