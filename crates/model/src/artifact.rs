use crate::linear::LinearPredictor;
use crate::trainer::EpochLoss;
use candlecast_core::common::TimeFrame;
use candlecast_core::forecast::normalizer::Normalizer;
use candlecast_core::forecast::port::Predictor;
use candlecast_core::model::error::ModelError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// # Summary
/// 训练产物：预测器、训练集上拟合的归一化器，以及生成它们的上下文。
///
/// # Invariants
/// - `look_back` 等于预测器的窗口长度。
/// - 归一化器随模型一起保存，推理时不得重新拟合。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub look_back: usize,
    pub normalizer: Normalizer,
    pub predictor: LinearPredictor,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<EpochLoss>,
}

impl ModelArtifact {
    /// 以 JSON 格式写入，必要时创建父目录
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| ModelError::Format(e.to_string()))?;
        fs::write(path, json)?;
        info!(
            "Saved model for {} ({}, look-back {}) to {}",
            self.symbol,
            self.timeframe,
            self.look_back,
            path.display()
        );
        Ok(())
    }

    /// # Summary
    /// 读取并校验模型文件。
    ///
    /// # Returns
    /// JSON 格式错误或窗口长度不一致时返回 `Format`。
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let raw = fs::read_to_string(path)?;
        let artifact: Self = serde_json::from_str(&raw)
            .map_err(|e| ModelError::Format(format!("{}: {}", path.display(), e)))?;
        if artifact.look_back == 0 || artifact.look_back != artifact.predictor.window_size() {
            return Err(ModelError::Format(format!(
                "{}: look-back {} does not match predictor window {}",
                path.display(),
                artifact.look_back,
                artifact.predictor.window_size()
            )));
        }
        info!(
            "Loaded model for {} trained at {} from {}",
            artifact.symbol,
            artifact.created_at,
            path.display()
        );
        Ok(artifact)
    }
}
