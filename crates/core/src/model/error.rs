use crate::forecast::error::ForecastError;
use thiserror::Error;

/// # Summary
/// 模型训练与模型文件读写的错误枚举。
#[derive(Error, Debug)]
pub enum ModelError {
    /// 模型文件读写失败
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// 模型文件格式错误
    #[error("Format error: {0}")]
    Format(String),
    /// 超参数非法
    #[error("Invalid hyper-parameter: {0}")]
    InvalidParameter(String),
    /// 训练或验证样本不足、预测失败等
    #[error(transparent)]
    Forecast(#[from] ForecastError),
}
