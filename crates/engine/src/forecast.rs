use crate::buffer::RollingWindow;
use candlecast_core::forecast::error::ForecastError;
use candlecast_core::forecast::normalizer::Normalizer;
use candlecast_core::forecast::port::Predictor;
use tracing::trace;

/// # Summary
/// 自回归的单步推进：用当前窗口预测下一个值，并返回吸收该预测后的新窗口。
///
/// # Arguments
/// * `predictor`: 单步预测器。
/// * `window`: 当前窗口（被消费）。
///
/// # Returns
/// `(新窗口, 本步预测值)`。
pub fn step(
    predictor: &dyn Predictor,
    window: RollingWindow,
) -> Result<(RollingWindow, f64), ForecastError> {
    let prediction = predictor.predict(&window.to_vec())?;
    Ok((window.advanced(prediction), prediction))
}

/// # Summary
/// 单次自回归多步预测（归一化空间）。
///
/// # Logic
/// 1. 以初始序列末尾的 W 个值构造窗口，W 取自预测器。
/// 2. 重复 H 次：预测下一个值，丢弃最旧值并追加该预测。
/// 3. 每一步严格依赖上一步的输出，按顺序同步执行。
///
/// # Arguments
/// * `predictor`: 单步预测器。
/// * `initial`: 已归一化的初始序列，长度至少为 W。
/// * `horizon`: 预测步数 H。
///
/// # Returns
/// 长度恰为 H 的预测序列；初始序列不足 W 时返回 `InsufficientData`。
pub fn forecast(
    predictor: &dyn Predictor,
    initial: &[f64],
    horizon: usize,
) -> Result<Vec<f64>, ForecastError> {
    let mut window = RollingWindow::from_tail(initial, predictor.window_size())?;
    let mut predictions = Vec::new();

    for i in 0..horizon {
        let (next_window, prediction) = step(predictor, window)?;
        trace!("step {}: prediction {}", i, prediction);
        predictions.push(prediction);
        window = next_window;
    }

    Ok(predictions)
}

/// # Summary
/// 价格空间的多步预测：归一化 -> 自回归预测 -> 反归一化。
///
/// # Arguments
/// * `predictor`: 单步预测器。
/// * `normalizer`: 训练集上拟合的归一化器，只读。
/// * `closes`: 原始收盘价，至少 W 个。
/// * `horizon`: 预测步数 H。
///
/// # Returns
/// 原始价格尺度下的 H 个预测值。
pub fn forecast_prices(
    predictor: &dyn Predictor,
    normalizer: &Normalizer,
    closes: &[f64],
    horizon: usize,
) -> Result<Vec<f64>, ForecastError> {
    let scaled = normalizer.transform_all(closes);
    let predictions = forecast(predictor, &scaled, horizon)?;
    Ok(normalizer.inverse_all(&predictions))
}

/// 价格空间的单步预测。
pub fn predict_next(
    predictor: &dyn Predictor,
    normalizer: &Normalizer,
    closes: &[f64],
) -> Result<f64, ForecastError> {
    let predictions = forecast_prices(predictor, normalizer, closes, 1)?;
    predictions
        .first()
        .copied()
        .ok_or_else(|| ForecastError::Predictor("no prediction produced".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlecast_core::testing::{FnPredictor, LastValuePredictor};

    #[test]
    fn test_forecast_length_and_feedback() {
        // 预测值 = 窗口均值 + 1，便于手算每一步
        let predictor = FnPredictor::new(
            2,
            Box::new(|w: &[f64]| w.iter().sum::<f64>() / 2.0 + 1.0),
        );

        let out = forecast(&predictor, &[0.0, 2.0], 3).unwrap();

        assert_eq!(out, vec![2.0, 3.0, 3.5]);
        assert_eq!(
            predictor.seen(),
            vec![vec![0.0, 2.0], vec![2.0, 2.0], vec![2.0, 3.0]]
        );
    }

    #[test]
    fn test_forecast_uses_most_recent_window() {
        let predictor = LastValuePredictor { window: 2 };
        let out = forecast(&predictor, &[9.0, 1.0, 2.0, 3.0], 4).unwrap();
        assert_eq!(out, vec![3.0; 4]);
    }

    #[test]
    fn test_forecast_zero_horizon_and_short_input() {
        let predictor = LastValuePredictor { window: 3 };
        assert!(forecast(&predictor, &[1.0, 2.0, 3.0], 0).unwrap().is_empty());
        assert_eq!(
            forecast(&predictor, &[1.0, 2.0], 5),
            Err(ForecastError::InsufficientData { needed: 3, got: 2 })
        );
    }

    /// 前 `budget` 次预测返回窗口最后一个值，之后报错
    struct Budgeted {
        budget: std::sync::atomic::AtomicUsize,
    }

    impl Predictor for Budgeted {
        fn window_size(&self) -> usize {
            1
        }

        fn predict(&self, window: &[f64]) -> Result<f64, ForecastError> {
            use std::sync::atomic::Ordering;
            self.budget
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| b.checked_sub(1))
                .map_err(|_| ForecastError::Predictor("budget exhausted".into()))?;
            Ok(window[0])
        }
    }

    #[test]
    fn test_forecast_unbounded_horizon_does_not_preallocate() {
        let predictor = Budgeted {
            budget: std::sync::atomic::AtomicUsize::new(3),
        };
        assert_eq!(
            forecast(&predictor, &[1.0], usize::MAX),
            Err(ForecastError::Predictor("budget exhausted".into()))
        );
    }

    #[test]
    fn test_forecast_is_deterministic() {
        let predictor = FnPredictor::new(3, Box::new(|w: &[f64]| w[0] * 0.2 + w[2] * 0.9));
        let a = forecast(&predictor, &[0.1, 0.4, 0.3], 10).unwrap();
        let b = forecast(&predictor, &[0.1, 0.4, 0.3], 10).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 10);
    }

    #[test]
    fn test_forecast_prices_round_trip() {
        let normalizer = Normalizer::fit(&[100.0, 200.0]).unwrap();
        let predictor = LastValuePredictor { window: 2 };

        let out = forecast_prices(&predictor, &normalizer, &[150.0, 175.0], 2).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|p| (p - 175.0).abs() < 1e-9));

        let next = predict_next(&predictor, &normalizer, &[150.0, 250.0]).unwrap();
        assert!((next - 250.0).abs() < 1e-9);
    }
}
