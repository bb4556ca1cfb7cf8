use candlecast_core::market::entity::{Observation, ObservationSeries};
use candlecast_core::store::error::StoreError;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::Path;
use tracing::debug;

/// 写出 CSV 时使用的时间格式
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// # Summary
/// 解析 CSV 中的时间戳。
///
/// # Logic
/// 1. 纯整数视为 Unix 毫秒。
/// 2. 尝试 RFC 3339（带时区）。
/// 3. 尝试无时区的 `YYYY-MM-DD HH:MM:SS[.fff]` 或 `T` 分隔写法，按 UTC 解释。
///
/// # Returns
/// 成功返回 UTC 时间，否则返回 None。
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(millis) = raw.parse::<i64>() {
        return DateTime::<Utc>::from_timestamp_millis(millis);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn csv_err(e: csv::Error) -> StoreError {
    StoreError::Csv(e.to_string())
}

/// # Summary
/// 从 CSV 文件读取原始观测点（保持文件内顺序，不排序不去重）。
///
/// # Logic
/// 1. 通过表头定位 `timestamp` 与 `close` 列，其余列忽略。
/// 2. 逐行解析，任一行格式错误即返回带行号的 `StoreError::Parse`。
///
/// # Arguments
/// * `path`: CSV 文件路径。
///
/// # Returns
/// 成功返回观测点列表。
pub fn read_observations(path: &Path) -> Result<Vec<Observation>, StoreError> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(StoreError::NotFound(display));
    }

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| StoreError::MissingColumn {
                column: name.to_string(),
                path: display.clone(),
            })
    };
    let ts_idx = column("timestamp")?;
    let close_idx = column("close")?;

    let mut points = Vec::new();
    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let parse_error = |message: String| StoreError::Parse {
            path: display.clone(),
            line,
            message,
        };

        let raw_ts = record.get(ts_idx).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts)
            .ok_or_else(|| parse_error(format!("invalid timestamp '{}'", raw_ts)))?;
        let raw_close = record.get(close_idx).unwrap_or_default();
        let close = raw_close
            .trim()
            .parse::<f64>()
            .map_err(|e| parse_error(format!("invalid close '{}': {}", raw_close, e)))?;

        points.push(Observation { timestamp, close });
    }

    debug!("Read {} observations from {}", points.len(), path.display());
    Ok(points)
}

/// # Summary
/// 读取一个已清洗的序列文件（训练/验证/测试集）。
///
/// # Logic
/// 读取后按时间排序并去重，保证返回的序列满足严格递增约束。
pub fn load_series(path: &Path) -> Result<ObservationSeries, StoreError> {
    let series = ObservationSeries::from_unsorted(read_observations(path)?);
    if series.is_empty() {
        return Err(StoreError::NotFound(format!("{} contains no rows", path.display())));
    }
    Ok(series)
}

/// # Summary
/// 将序列写为 `timestamp, close, delta` 三列的 CSV 文件。
///
/// # Logic
/// 1. 必要时创建父目录。
/// 2. 计算相邻收盘价变化率并逐行写出。
pub fn save_series(path: &Path, series: &ObservationSeries) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer
        .write_record(["timestamp", "close", "delta"])
        .map_err(csv_err)?;

    for (point, delta) in series.iter().zip(series.deltas()) {
        writer
            .write_record([
                point.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                point.close.to_string(),
                delta.to_string(),
            ])
            .map_err(csv_err)?;
    }

    writer.flush()?;
    Ok(())
}
