use crate::forecast::error::ForecastError;

/// # Summary
/// 单步预测器契约：输入 W 个归一化值，输出下一个归一化值。
///
/// # Invariants
/// - 实现必须是已拟合且无可见内部状态的纯函数，同一窗口总得到同一结果。
/// - 调用同步完成，不得挂起。
pub trait Predictor: Send + Sync {
    /// 模型要求的输入窗口长度 W
    fn window_size(&self) -> usize;

    /// # Summary
    /// 预测下一步的归一化值。
    ///
    /// # Arguments
    /// * `window`: 长度恰为 `window_size()` 的归一化窗口，最旧在前。
    ///
    /// # Returns
    /// 成功返回归一化预测值，窗口长度不符时返回 `InvalidArgument`。
    fn predict(&self, window: &[f64]) -> Result<f64, ForecastError>;
}
