use crate::forecast::error::ForecastError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// # Summary
/// 已拟合的 min-max 归一化变换，将原始价格映射到 [0, 1]。
///
/// # Invariants
/// - 只能通过 `fit` 在训练子集上拟合一次，之后不可变；验证、测试与实时数据一律复用。
/// - 不做截断：超出拟合区间的值会映射到 [0, 1] 之外（例如 1.5）。
/// - 区间宽度为 0 时按宽度 1 处理，变换退化为平移。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    min: f64,
    max: f64,
}

impl Normalizer {
    /// # Summary
    /// 在训练数据上拟合归一化参数。
    ///
    /// # Logic
    /// 1. 忽略非有限值（NaN、无穷）。
    /// 2. 记录最小值与最大值。
    ///
    /// # Arguments
    /// * `values`: 训练子集的原始收盘价。
    ///
    /// # Returns
    /// 成功返回不可变的 Normalizer；无有效数据时返回 `InsufficientData`。
    pub fn fit(values: &[f64]) -> Result<Self, ForecastError> {
        let mut finite = values.iter().copied().filter(|v| v.is_finite());
        let first = finite.next().ok_or(ForecastError::InsufficientData {
            needed: 1,
            got: 0,
        })?;
        let (min, max) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        debug!("Normalizer fitted on {} values: min={}, max={}", values.len(), min, max);
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    fn range(&self) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 { 1.0 } else { range }
    }

    /// 原始值 -> 归一化值
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.range()
    }

    /// 归一化值 -> 原始值
    pub fn inverse(&self, value: f64) -> f64 {
        value * self.range() + self.min
    }

    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.transform(*v)).collect()
    }

    pub fn inverse_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.inverse(*v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_and_transform_without_clamping() {
        let n = Normalizer::fit(&[100.0, 200.0]).unwrap();
        assert_eq!(n.min(), 100.0);
        assert_eq!(n.max(), 200.0);
        assert!((n.transform(150.0) - 0.5).abs() < 1e-12);
        assert!((n.transform(250.0) - 1.5).abs() < 1e-12);
        assert!((n.transform(50.0) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_round_trip_within_tolerance() {
        let n = Normalizer::fit(&[1834.25, 1901.5, 1799.75, 1850.0]).unwrap();
        for x in [1799.75, 1820.123, 1901.5, 1855.5] {
            assert!((n.inverse(n.transform(x)) - x).abs() < 1e-9);
        }
    }

    #[test]
    fn test_applied_series_uses_fitted_bounds() {
        let train = [10.0, 20.0];
        let other = [1000.0, 2000.0];
        let n = Normalizer::fit(&train).unwrap();

        let scaled = n.transform_all(&other);
        assert!((scaled[0] - 99.0).abs() < 1e-12);
        assert!((scaled[1] - 199.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_series_and_empty_fit() {
        let n = Normalizer::fit(&[5.0, 5.0]).unwrap();
        assert_eq!(n.transform(5.0), 0.0);
        assert_eq!(n.inverse(0.25), 5.25);

        let err = Normalizer::fit(&[]).unwrap_err();
        assert_eq!(err, ForecastError::InsufficientData { needed: 1, got: 0 });
    }
}
