use thiserror::Error;

/// # Summary
/// 存储层错误枚举，处理 CSV 文件读写、字段缺失与解析失败等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 文件系统读写失败
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// CSV 编解码失败
    #[error("CSV error: {0}")]
    Csv(String),
    /// 缺少必需的列
    #[error("Missing column '{column}' in {path}")]
    MissingColumn { column: String, path: String },
    /// 字段值无法解析
    #[error("Parse error at {path}:{line}: {message}")]
    Parse {
        path: String,
        line: u64,
        message: String,
    },
    /// 参数非法，如切分比例越界
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// 数据集为空或文件不存在
    #[error("Not found: {0}")]
    NotFound(String),
}
