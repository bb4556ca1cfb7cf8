use crate::series::{read_observations, save_series};
use candlecast_core::market::entity::ObservationSeries;
use candlecast_core::store::error::StoreError;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// # Summary
/// 按时间先后切分得到的训练/验证/测试三段数据。
///
/// # Invariants
/// - 三段首尾相接、互不重叠，拼接后等于原序列。
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: ObservationSeries,
    pub validation: ObservationSeries,
    pub test: ObservationSeries,
}

/// 三个切分文件的输出位置
#[derive(Debug, Clone)]
pub struct SplitPaths {
    pub train: PathBuf,
    pub validation: PathBuf,
    pub test: PathBuf,
}

/// # Summary
/// 合并多个原始 CSV 文件为一条干净的观测序列。
///
/// # Logic
/// 1. 逐个读取文件；缺少 `timestamp`/`close` 列的文件告警后跳过，读取失败的文件记录错误后跳过。
/// 2. 合并所有观测点，按时间排序并去重（保留首次出现）。
///
/// # Arguments
/// * `paths`: 原始文件列表，顺序决定重复时间戳的取舍。
///
/// # Returns
/// 成功返回合并后的序列；没有任何可用数据时返回 `StoreError::NotFound`。
pub fn merge_files(paths: &[PathBuf]) -> Result<ObservationSeries, StoreError> {
    let mut points = Vec::new();
    let mut used = 0usize;

    for path in paths {
        match read_observations(path) {
            Ok(mut rows) => {
                info!("Read {} rows from {}", rows.len(), path.display());
                points.append(&mut rows);
                used += 1;
            }
            Err(e @ StoreError::MissingColumn { .. }) => {
                warn!("Skipping {}: {}", path.display(), e);
            }
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
            }
        }
    }

    if points.is_empty() {
        return Err(StoreError::NotFound(format!(
            "no usable rows in {} input file(s)",
            paths.len()
        )));
    }

    let total = points.len();
    let series = ObservationSeries::from_unsorted(points);
    info!(
        "Merged {} rows from {} file(s); {} unique timestamps",
        total,
        used,
        series.len()
    );
    Ok(series)
}

// floor(len * ratio)，ratio 已校验在 [0, 1]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn portion(len: usize, ratio: f64) -> usize {
    ((len as f64) * ratio).floor() as usize
}

/// # Summary
/// 按时间顺序切分序列。
///
/// # Logic
/// 1. `train_end = floor(L * train_ratio)`。
/// 2. `validation_end = train_end + floor(L * validation_ratio)`。
/// 3. 剩余部分为测试集。
///
/// # Arguments
/// * `series`: 已清洗的完整序列。
/// * `train_ratio`: 训练集比例。
/// * `validation_ratio`: 验证集比例。
///
/// # Returns
/// 比例非法（负数、非有限值或之和大于 1）时返回 `StoreError::InvalidInput`。
pub fn split(
    series: &ObservationSeries,
    train_ratio: f64,
    validation_ratio: f64,
) -> Result<DatasetSplit, StoreError> {
    let valid = |r: f64| r.is_finite() && (0.0..=1.0).contains(&r);
    if !valid(train_ratio) || !valid(validation_ratio) || train_ratio + validation_ratio > 1.0 {
        return Err(StoreError::InvalidInput(format!(
            "invalid split ratios: train={}, validation={}",
            train_ratio, validation_ratio
        )));
    }

    let len = series.len();
    let train_end = portion(len, train_ratio);
    let validation_end = (train_end + portion(len, validation_ratio)).min(len);

    Ok(DatasetSplit {
        train: series.slice(0..train_end),
        validation: series.slice(train_end..validation_end),
        test: series.slice(validation_end..len),
    })
}

/// # Summary
/// 完整的数据准备流程：合并、清洗、落盘并切分。
///
/// # Logic
/// 1. 调用 `merge_files` 得到干净序列并写入 `cleaned`。
/// 2. 调用 `split` 切分。
/// 3. 三段分别写入对应文件。
pub fn prepare(
    inputs: &[PathBuf],
    cleaned: &Path,
    paths: &SplitPaths,
    train_ratio: f64,
    validation_ratio: f64,
) -> Result<DatasetSplit, StoreError> {
    let series = merge_files(inputs)?;
    save_series(cleaned, &series)?;
    info!("Cleaned series written to {}", cleaned.display());

    let parts = split(&series, train_ratio, validation_ratio)?;
    for (name, part, path) in [
        ("train", &parts.train, &paths.train),
        ("validation", &parts.validation, &paths.validation),
        ("test", &parts.test, &paths.test),
    ] {
        save_series(path, part)?;
        match (part.first(), part.last()) {
            (Some(first), Some(last)) => info!(
                "{} split: {} rows ({} .. {}) -> {}",
                name,
                part.len(),
                first.timestamp,
                last.timestamp,
                path.display()
            ),
            _ => warn!("{} split is empty -> {}", name, path.display()),
        }
    }

    Ok(parts)
}
