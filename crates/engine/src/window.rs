use candlecast_core::forecast::entity::Sample;
use candlecast_core::forecast::error::ForecastError;

/// # Summary
/// 将一条有序序列切成 (窗口, 目标) 样本对。
///
/// # Logic
/// 1. 第 i 个样本的窗口为 `values[i..i+W]`，目标为 `values[i+W]`。
/// 2. 步长为 1，相邻窗口重叠 W-1 个元素，输出顺序与输入一致。
/// 3. 序列长度 L 不大于 W 时返回空列表（不是错误）。
///
/// # Arguments
/// * `values`: 已归一化的序列。
/// * `window`: 窗口长度 W。
///
/// # Returns
/// 恰好 `L - W` 个样本；W 为 0 时返回 `InvalidArgument`。
pub fn windows(values: &[f64], window: usize) -> Result<Vec<Sample>, ForecastError> {
    if window == 0 {
        return Err(ForecastError::InvalidArgument(
            "window size must be positive".into(),
        ));
    }
    if values.len() <= window {
        return Ok(Vec::new());
    }

    Ok(values
        .windows(window + 1)
        .map(|chunk| Sample {
            window: chunk[..window].to_vec(),
            target: chunk[window],
        })
        .collect())
}
