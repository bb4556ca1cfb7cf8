use crate::check::closed_candles;
use crate::forecast::predict_next;
use candlecast_core::common::time::TimeProvider;
use candlecast_core::common::{Pair, TimeFrame};
use candlecast_core::config::LiveConfig;
use candlecast_core::forecast::entity::{ErrorSummary, Reconciliation};
use candlecast_core::forecast::error::ForecastError;
use candlecast_core::forecast::normalizer::Normalizer;
use candlecast_core::forecast::port::Predictor;
use candlecast_core::market::error::MarketError;
use candlecast_core::market::port::ObservationSource;
use chrono::{DateTime, Duration, Utc};
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 对账记录流别名，供展示层消费。
pub type ReconciliationStream = Pin<Box<dyn Stream<Item = Reconciliation> + Send>>;

/// 单次请求允许回溯的最大 K 线数
const MAX_LOOKBACK: i64 = 1000;

/// # Summary
/// 实时会话的节奏参数。
#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub timeframe: TimeFrame,
    // 会话总时长
    pub session: Duration,
    // 拉取失败后的固定退避
    pub retry_backoff: Duration,
    // 目标 K 线收盘后的额外等待
    pub settle: Duration,
}

impl LiveSettings {
    /// # Summary
    /// 由配置构造节奏参数。
    ///
    /// # Returns
    /// 时长超出可表示范围时返回 `InvalidArgument`。
    pub fn from_config(config: &LiveConfig, timeframe: TimeFrame) -> Result<Self, ForecastError> {
        let span = |value: Option<Duration>, name: &str, raw: i64| {
            value.ok_or_else(|| {
                ForecastError::InvalidArgument(format!("{} {} is out of range", name, raw))
            })
        };
        Ok(Self {
            timeframe,
            session: span(
                Duration::try_minutes(config.session_minutes),
                "session_minutes",
                config.session_minutes,
            )?,
            retry_backoff: span(
                Duration::try_seconds(config.retry_backoff_secs),
                "retry_backoff_secs",
                config.retry_backoff_secs,
            )?,
            settle: span(
                Duration::try_seconds(config.settle_secs),
                "settle_secs",
                config.settle_secs,
            )?,
        })
    }
}

/// # Summary
/// 一次实时会话的结果。
///
/// # Invariants
/// - `records` 只包含成功对账的记录，按目标时间升序，失败的拉取不会留下任何条目。
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub records: Vec<Reconciliation>,
    pub failed_fetches: usize,
    pub summary: ErrorSummary,
}

/// 已做出、尚未对账的预测
#[derive(Debug, Clone, Copy)]
struct Pending {
    target_time: DateTime<Utc>,
    last_close: f64,
    predicted: f64,
}

/// # Summary
/// 实时预测与对账会话：每分钟用最新真实数据做一步预测，等目标 K 线收盘后对账。
///
/// # Invariants
/// - 每轮重新拉取真实数据，不使用之前的预测值作为输入。
/// - 归一化器只读共享，会话内不会重新拟合。
/// - 每次等待前都检查会话截止时间，不会为一整轮等待而越过截止时间。
/// - 行情源失败只会记录日志并退避重试，不会终止会话，也不会改动已记录的历史。
pub struct LiveSession {
    source: Arc<dyn ObservationSource>,
    predictor: Arc<dyn Predictor>,
    normalizer: Arc<Normalizer>,
    clock: Arc<dyn TimeProvider>,
    pair: Pair,
    settings: LiveSettings,
}

impl LiveSession {
    /// # Summary
    /// 创建实时会话。
    ///
    /// # Returns
    /// 预测器窗口为 0 或节奏参数非正时返回 `InvalidArgument`。
    pub fn new(
        source: Arc<dyn ObservationSource>,
        predictor: Arc<dyn Predictor>,
        normalizer: Arc<Normalizer>,
        clock: Arc<dyn TimeProvider>,
        pair: Pair,
        settings: LiveSettings,
    ) -> Result<Self, ForecastError> {
        if predictor.window_size() == 0 {
            return Err(ForecastError::InvalidArgument(
                "predictor window size must be positive".into(),
            ));
        }
        if settings.session <= Duration::zero() || settings.retry_backoff <= Duration::zero() {
            return Err(ForecastError::InvalidArgument(format!(
                "session ({}) and retry backoff ({}) must be positive",
                settings.session, settings.retry_backoff
            )));
        }
        if settings.settle < Duration::zero() {
            return Err(ForecastError::InvalidArgument(format!(
                "settle delay ({}) must not be negative",
                settings.settle
            )));
        }
        Ok(Self {
            source,
            predictor,
            normalizer,
            clock,
            pair,
            settings,
        })
    }

    /// # Summary
    /// 在后台任务中运行会话，并返回对账记录流。
    ///
    /// # Logic
    /// 1. 创建有界通道，发送端交给会话。
    /// 2. 会话结束时发送端被释放，流随之结束。
    ///
    /// # Returns
    /// `(记录流, 会话任务句柄)`。
    pub fn spawn(self) -> (ReconciliationStream, JoinHandle<Result<SessionReport, ForecastError>>) {
        let (tx, rx) = mpsc::channel(64);
        let handle = tokio::spawn(async move { self.run(Some(tx)).await });
        (Box::pin(ReceiverStream::new(rx)), handle)
    }

    /// # Summary
    /// 运行会话直到截止时间。
    ///
    /// # Logic
    /// 1. 拉取最近 W 根已收盘 K 线，预测下一根的收盘价。
    /// 2. 计算目标 K 线收盘并落盘的时刻；若晚于截止时间则结束会话。
    /// 3. 协作式等待到该时刻，拉取目标 K 线并对账。
    /// 4. 记录并向 `sink` 推送对账结果，进入下一轮。
    /// 5. 任何拉取失败：告警、检查截止时间、固定退避后重试同一步骤。
    ///
    /// # Arguments
    /// * `sink`: 可选的展示层通道；接收端关闭后会话继续运行。
    ///
    /// # Returns
    /// 会话报告；预测器错误等非暂时性错误会立即返回。
    pub async fn run(
        &self,
        mut sink: Option<mpsc::Sender<Reconciliation>>,
    ) -> Result<SessionReport, ForecastError> {
        let session_id = Uuid::new_v4();
        let started_at = self.clock.now();
        let deadline = started_at
            .checked_add_signed(self.settings.session)
            .ok_or_else(|| {
                ForecastError::InvalidArgument(format!(
                    "session of {} from {} is out of range",
                    self.settings.session, started_at
                ))
            })?;
        let mut records: Vec<Reconciliation> = Vec::new();
        let mut failed_fetches = 0usize;

        info!(
            "Live session {} started for {} ({}), window {}, until {}",
            session_id,
            self.pair,
            self.settings.timeframe,
            self.predictor.window_size(),
            deadline
        );

        'session: while self.clock.now() < deadline {
            // 步骤 1: 基于最新真实数据做一步预测
            let pending = match self.predict().await {
                Ok(pending) => pending,
                Err(e) if e.is_transient() => {
                    failed_fetches += 1;
                    warn!("Session {}: prediction fetch failed: {}", session_id, e);
                    if !self.backoff(deadline).await {
                        break 'session;
                    }
                    continue 'session;
                }
                Err(e) => return Err(e),
            };
            info!(
                "Session {}: predicted {:.2} for {} (last close {:.2})",
                session_id, pending.predicted, pending.target_time, pending.last_close
            );

            // 步骤 2: 截止时间检查，然后等待目标 K 线收盘
            let ready_at = self
                .settings
                .timeframe
                .duration()
                .checked_add(&self.settings.settle)
                .and_then(|wait| pending.target_time.checked_add_signed(wait));
            let Some(ready_at) = ready_at.filter(|t| *t <= deadline) else {
                info!(
                    "Session {}: target {} settles after the deadline, stopping",
                    session_id, pending.target_time
                );
                break 'session;
            };
            debug!("Session {}: waiting until {}", session_id, ready_at);
            self.clock.sleep_until(ready_at).await;

            // 步骤 3: 拉取真实值，失败则退避重试同一目标
            let actual = loop {
                match self.fetch_actual(pending.target_time).await {
                    Ok(actual) => break actual,
                    Err(e) if e.is_transient() => {
                        failed_fetches += 1;
                        warn!(
                            "Session {}: reconciliation fetch for {} failed: {}",
                            session_id, pending.target_time, e
                        );
                        if !self.backoff(deadline).await {
                            warn!(
                                "Session {}: dropping unreconciled prediction for {}",
                                session_id, pending.target_time
                            );
                            break 'session;
                        }
                    }
                    Err(e) => return Err(e),
                }
            };

            // 步骤 4: 记录并推送
            let record = Reconciliation::new(
                pending.target_time,
                pending.last_close,
                pending.predicted,
                actual,
            );
            info!(
                "Session {}: actual {:.2} at {}, error {:+.2} ({:+.4}%)",
                session_id, record.actual, record.target_time, record.abs_error, record.pct_error
            );
            records.push(record.clone());

            if let Some(tx) = &sink {
                if tx.send(record).await.is_err() {
                    debug!("Session {}: presentation consumer closed", session_id);
                    sink = None;
                }
            }
        }

        let summary = ErrorSummary::from_records(&records);
        info!(
            "Live session {} finished: {} reconciliations, {} failed fetches, MAE {:.4}",
            session_id,
            records.len(),
            failed_fetches,
            summary.mae
        );

        Ok(SessionReport {
            session_id,
            started_at,
            finished_at: self.clock.now(),
            records,
            failed_fetches,
            summary,
        })
    }

    /// 用最新 W 根已收盘 K 线预测下一根。数据不足视为数据源暂不可用。
    async fn predict(&self) -> Result<Pending, ForecastError> {
        let w = self.predictor.window_size();
        let candles = closed_candles(self.source.as_ref(), &self.pair, self.settings.timeframe, w)
            .await
            .map_err(|e| match e {
                ForecastError::InsufficientData { needed, got } => {
                    ForecastError::SourceUnavailable(MarketError::NotFound(format!(
                        "only {} of {} closed candles available",
                        got, needed
                    )))
                }
                other => other,
            })?;

        let last = candles
            .last()
            .ok_or_else(|| ForecastError::InsufficientData { needed: w, got: 0 })?;
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let predicted = predict_next(self.predictor.as_ref(), &self.normalizer, &closes)?;

        Ok(Pending {
            target_time: last.time + self.settings.timeframe.duration(),
            last_close: last.close,
            predicted,
        })
    }

    /// # Summary
    /// 拉取目标 K 线的收盘价。
    ///
    /// # Logic
    /// 1. 按距离目标的周期数决定回溯数量，保证退避多次后仍能取到目标。
    /// 2. 目标尚未收盘或不在响应中时视为暂时不可用。
    async fn fetch_actual(&self, target_time: DateTime<Utc>) -> Result<f64, ForecastError> {
        let step = self.settings.timeframe.duration();
        let elapsed = (self.clock.now() - target_time).num_seconds() / step.num_seconds().max(1);
        let count = usize::try_from((elapsed + 2).clamp(2, MAX_LOOKBACK)).unwrap_or(2);

        let candles = self
            .source
            .fetch_latest(&self.pair, self.settings.timeframe, count)
            .await?;

        candles
            .iter()
            .find(|c| c.time == target_time && c.is_final)
            .map(|c| c.close)
            .ok_or_else(|| {
                ForecastError::SourceUnavailable(MarketError::NotFound(format!(
                    "closed candle at {} not in response",
                    target_time
                )))
            })
    }

    /// 固定退避；若退避结束时已过截止时间则返回 false，不进入等待。
    async fn backoff(&self, deadline: DateTime<Utc>) -> bool {
        let resume_at = self.clock.now().checked_add_signed(self.settings.retry_backoff);
        let Some(resume_at) = resume_at.filter(|t| *t < deadline) else {
            info!("Backoff would end after the session deadline, stopping");
            return false;
        };
        self.clock.sleep_until(resume_at).await;
        true
    }
}
