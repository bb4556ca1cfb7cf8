use crate::series::TIMESTAMP_FORMAT;
use candlecast_core::forecast::entity::Reconciliation;
use candlecast_core::store::error::StoreError;
use std::path::Path;

/// # Summary
/// 将对账记录写为 CSV，供离线作图或复盘使用。
///
/// # Logic
/// 1. 必要时创建父目录。
/// 2. 写出表头 `target_time,last_close,predicted,actual,abs_error,pct_error` 与全部记录。
///
/// # Arguments
/// * `path`: 输出文件。
/// * `records`: 按时间顺序的对账记录。
pub fn write_reconciliations(path: &Path, records: &[Reconciliation]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path).map_err(|e| StoreError::Csv(e.to_string()))?;
    writer
        .write_record([
            "target_time",
            "last_close",
            "predicted",
            "actual",
            "abs_error",
            "pct_error",
        ])
        .map_err(|e| StoreError::Csv(e.to_string()))?;

    for r in records {
        writer
            .write_record([
                r.target_time.format(TIMESTAMP_FORMAT).to_string(),
                r.last_close.to_string(),
                r.predicted.to_string(),
                r.actual.to_string(),
                r.abs_error.to_string(),
                r.pct_error.to_string(),
            ])
            .map_err(|e| StoreError::Csv(e.to_string()))?;
    }

    writer.flush()?;
    Ok(())
}
