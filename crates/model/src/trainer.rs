use crate::linear::LinearPredictor;
use candlecast_core::config::TrainConfig;
use candlecast_core::forecast::entity::Sample;
use candlecast_core::forecast::error::ForecastError;
use candlecast_core::forecast::normalizer::Normalizer;
use candlecast_core::market::entity::ObservationSeries;
use candlecast_core::model::error::ModelError;
use candlecast_engine::window::windows;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// # Summary
/// 训练超参数。
#[derive(Debug, Clone)]
pub struct TrainParams {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    // 验证损失连续多少轮未改善即停止，0 表示不提前停止
    pub patience: usize,
    pub seed: u64,
}

impl From<&TrainConfig> for TrainParams {
    fn from(config: &TrainConfig) -> Self {
        Self {
            epochs: config.epochs,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
            patience: config.patience,
            seed: config.seed,
        }
    }
}

/// 单轮训练的损失记录（归一化空间的 MSE）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochLoss {
    pub epoch: usize,
    pub train_loss: f64,
    pub validation_loss: f64,
}

/// # Summary
/// 训练结果。
///
/// # Invariants
/// - `predictor` 是验证损失最低那一轮结束时的权重，而非最后一轮。
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub predictor: LinearPredictor,
    pub history: Vec<EpochLoss>,
    pub best_epoch: usize,
    pub best_loss: f64,
}

/// # Summary
/// 归一化并切分窗口后的训练数据。
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub normalizer: Normalizer,
    pub train: Vec<Sample>,
    pub validation: Vec<Sample>,
}

/// # Summary
/// 为训练准备样本。
///
/// # Logic
/// 1. 只在训练序列上拟合归一化器。
/// 2. 用同一个归一化器变换训练与验证序列，并各自切分窗口。
///
/// # Returns
/// 训练序列不足以构成任何样本时返回 `InsufficientData`。
pub fn prepare_samples(
    train: &ObservationSeries,
    validation: &ObservationSeries,
    look_back: usize,
) -> Result<PreparedData, ModelError> {
    let normalizer = Normalizer::fit(&train.closes())?;
    let train_samples = windows(&normalizer.transform_all(&train.closes()), look_back)?;
    if train_samples.is_empty() {
        return Err(ForecastError::InsufficientData {
            needed: look_back.saturating_add(1),
            got: train.len(),
        }
        .into());
    }
    let validation_samples = windows(&normalizer.transform_all(&validation.closes()), look_back)?;
    info!(
        "Prepared {} training and {} validation samples (look-back {})",
        train_samples.len(),
        validation_samples.len(),
        look_back
    );

    Ok(PreparedData {
        normalizer,
        train: train_samples,
        validation: validation_samples,
    })
}

/// # Summary
/// 线性预测器的小批量梯度下降训练器。
pub struct Trainer {
    params: TrainParams,
}

impl Trainer {
    /// 校验超参数后创建训练器
    pub fn new(params: TrainParams) -> Result<Self, ModelError> {
        if params.epochs == 0 || params.batch_size == 0 {
            return Err(ModelError::InvalidParameter(format!(
                "epochs ({}) and batch size ({}) must be positive",
                params.epochs, params.batch_size
            )));
        }
        if !(params.learning_rate.is_finite() && params.learning_rate > 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "learning rate must be positive, got {}",
                params.learning_rate
            )));
        }
        Ok(Self { params })
    }

    /// # Summary
    /// 在训练样本上拟合线性预测器。
    ///
    /// # Logic
    /// 1. 权重全零初始化，窗口长度取自第一个训练样本。
    /// 2. 每轮用固定种子的随机数打乱样本顺序，按批计算 MSE 梯度并更新。
    /// 3. 每轮结束记录训练与验证损失；验证损失创新低时保存当前权重。
    /// 4. 验证损失连续 `patience` 轮未改善则提前停止。
    /// 5. 验证集为空时以训练损失作为监控指标。
    ///
    /// # Arguments
    /// * `train`: 训练样本。
    /// * `validation`: 验证样本，可以为空。
    ///
    /// # Returns
    /// 最佳轮次的预测器与完整的损失历史。
    pub fn fit(&self, train: &[Sample], validation: &[Sample]) -> Result<TrainOutcome, ModelError> {
        let window = train
            .first()
            .map(|s| s.window.len())
            .ok_or(ForecastError::InsufficientData { needed: 1, got: 0 })?;
        if let Some(bad) = train
            .iter()
            .chain(validation)
            .find(|s| s.window.len() != window)
        {
            return Err(ForecastError::InvalidArgument(format!(
                "mixed window sizes: {} and {}",
                window,
                bad.window.len()
            ))
            .into());
        }
        if validation.is_empty() {
            warn!("No validation samples, monitoring training loss instead");
        }

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut order: Vec<usize> = (0..train.len()).collect();
        let mut predictor = LinearPredictor::zeros(window);
        let mut best = predictor.clone();
        let mut best_epoch = 0;
        let mut best_loss = f64::INFINITY;
        let mut stale = 0;
        let mut history = Vec::with_capacity(self.params.epochs);

        for epoch in 1..=self.params.epochs {
            order.shuffle(&mut rng);
            for batch in order.chunks(self.params.batch_size) {
                let (grad_w, grad_b) = gradient(&predictor, train, batch);
                predictor.apply_gradient(&grad_w, grad_b, self.params.learning_rate);
            }

            let train_loss = mse(&predictor, train);
            let validation_loss = if validation.is_empty() {
                train_loss
            } else {
                mse(&predictor, validation)
            };
            if !train_loss.is_finite() {
                return Err(ModelError::InvalidParameter(format!(
                    "training diverged at epoch {} (learning rate {})",
                    epoch, self.params.learning_rate
                )));
            }
            history.push(EpochLoss {
                epoch,
                train_loss,
                validation_loss,
            });
            debug!(
                "Epoch {}: train loss {:.6}, validation loss {:.6}",
                epoch, train_loss, validation_loss
            );

            if validation_loss < best_loss {
                best_loss = validation_loss;
                best_epoch = epoch;
                best = predictor.clone();
                stale = 0;
            } else {
                stale += 1;
                if self.params.patience > 0 && stale >= self.params.patience {
                    info!(
                        "Early stopping at epoch {}, best epoch {} (loss {:.6})",
                        epoch, best_epoch, best_loss
                    );
                    break;
                }
            }
        }

        info!(
            "Training finished after {} epochs, best validation loss {:.6} at epoch {}",
            history.len(),
            best_loss,
            best_epoch
        );
        Ok(TrainOutcome {
            predictor: best,
            history,
            best_epoch,
            best_loss,
        })
    }
}

/// 样本集上的均方误差，空集为 0
pub fn mse(predictor: &LinearPredictor, samples: &[Sample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let total: f64 = samples
        .iter()
        .map(|s| (predictor.output(&s.window) - s.target).powi(2))
        .sum();
    total / len_f64(samples.len())
}

// 一个批次上 MSE 对权重与偏置的梯度
fn gradient(predictor: &LinearPredictor, samples: &[Sample], batch: &[usize]) -> (Vec<f64>, f64) {
    let mut grad_w = vec![0.0; predictor.weights().len()];
    let mut grad_b = 0.0;
    for sample in batch.iter().filter_map(|&i| samples.get(i)) {
        let err = predictor.output(&sample.window) - sample.target;
        for (g, x) in grad_w.iter_mut().zip(&sample.window) {
            *g += 2.0 * err * x;
        }
        grad_b += 2.0 * err;
    }
    let n = len_f64(batch.len().max(1));
    grad_w.iter_mut().for_each(|g| *g /= n);
    (grad_w, grad_b / n)
}

// 样本数远小于 2^52，转换无精度损失
#[allow(clippy::cast_precision_loss)]
fn len_f64(n: usize) -> f64 {
    n as f64
}
