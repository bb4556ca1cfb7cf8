use candlecast_core::forecast::error::ForecastError;
use candlecast_core::forecast::port::Predictor;
use serde::{Deserialize, Serialize};

/// # Summary
/// 线性单步预测器：`y = w · x + b`，输入输出均在归一化空间。
///
/// # Invariants
/// - 窗口长度等于权重个数。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPredictor {
    weights: Vec<f64>,
    bias: f64,
}

impl LinearPredictor {
    pub fn new(weights: Vec<f64>, bias: f64) -> Self {
        Self { weights, bias }
    }

    /// 全零初始化
    pub fn zeros(window: usize) -> Self {
        Self::new(vec![0.0; window], 0.0)
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    // 训练内循环使用，调用方保证长度一致
    pub(crate) fn output(&self, window: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(window)
            .fold(self.bias, |acc, (w, x)| acc + w * x)
    }

    pub(crate) fn apply_gradient(&mut self, grad_w: &[f64], grad_b: f64, learning_rate: f64) {
        for (w, g) in self.weights.iter_mut().zip(grad_w) {
            *w -= learning_rate * g;
        }
        self.bias -= learning_rate * grad_b;
    }
}

impl Predictor for LinearPredictor {
    fn window_size(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, window: &[f64]) -> Result<f64, ForecastError> {
        if window.len() != self.weights.len() {
            return Err(ForecastError::InvalidArgument(format!(
                "expected window of {}, got {}",
                self.weights.len(),
                window.len()
            )));
        }
        let y = self.output(window);
        if !y.is_finite() {
            return Err(ForecastError::Predictor(format!(
                "non-finite output {} for window {:?}",
                y, window
            )));
        }
        Ok(y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_predict() {
        let p = LinearPredictor::new(vec![0.5, 0.25], 0.1);
        assert_eq!(p.window_size(), 2);
        assert!((p.predict(&[0.4, 0.8]).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_linear_rejects_wrong_window() {
        let p = LinearPredictor::zeros(3);
        assert!(matches!(
            p.predict(&[1.0, 2.0]),
            Err(ForecastError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_linear_rejects_non_finite_output() {
        let p = LinearPredictor::new(vec![f64::MAX, f64::MAX], 0.0);
        assert!(matches!(
            p.predict(&[f64::MAX, f64::MAX]),
            Err(ForecastError::Predictor(_))
        ));
    }
}
