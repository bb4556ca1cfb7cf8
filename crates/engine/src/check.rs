use crate::forecast::{forecast_prices, predict_next};
use candlecast_core::common::{Pair, TimeFrame};
use candlecast_core::forecast::entity::Reconciliation;
use candlecast_core::forecast::error::ForecastError;
use candlecast_core::forecast::normalizer::Normalizer;
use candlecast_core::forecast::port::Predictor;
use candlecast_core::market::entity::Candle;
use candlecast_core::market::port::ObservationSource;
use tracing::{debug, info};

/// # Summary
/// 拉取最近 `count` 根已收盘的 K 线。
///
/// # Logic
/// 1. 多请求一根，以抵消尚未收盘的最新 K 线。
/// 2. 丢弃未收盘的 K 线，保留末尾 `count` 根。
///
/// # Returns
/// 已收盘 K 线不足 `count` 根时返回 `InsufficientData`。
pub async fn closed_candles(
    source: &dyn ObservationSource,
    pair: &Pair,
    timeframe: TimeFrame,
    count: usize,
) -> Result<Vec<Candle>, ForecastError> {
    // 多请求一根以抵消未收盘的 K 线
    let request = count.checked_add(1).ok_or_else(|| too_many(count, 1))?;
    let mut candles: Vec<Candle> = source
        .fetch_latest(pair, timeframe, request)
        .await?
        .into_iter()
        .filter(|c| c.is_final)
        .collect();
    debug!("{} closed candles for {} (wanted {})", candles.len(), pair, count);

    if candles.len() < count {
        return Err(ForecastError::InsufficientData {
            needed: count,
            got: candles.len(),
        });
    }
    Ok(candles.split_off(candles.len() - count))
}

fn too_many(window: usize, extra: usize) -> ForecastError {
    ForecastError::InvalidArgument(format!(
        "cannot request {} + {} candles",
        window, extra
    ))
}

/// # Summary
/// 用最近 W+1 根 K 线检验一次单步预测。
///
/// # Logic
/// 1. 前 W 根作为输入，最后一根作为真实值。
/// 2. 预测并反归一化后与真实值对账。
///
/// # Returns
/// 单条对账记录。
pub async fn predict_now(
    source: &dyn ObservationSource,
    pair: &Pair,
    timeframe: TimeFrame,
    predictor: &dyn Predictor,
    normalizer: &Normalizer,
) -> Result<Reconciliation, ForecastError> {
    let w = predictor.window_size();
    let needed = w.checked_add(1).ok_or_else(|| too_many(w, 1))?;
    let candles = closed_candles(source, pair, timeframe, needed).await?;
    let (input, actual) = candles.split_at(w);
    let actual = &actual[0];
    let last_close = input.last().map(|c| c.close).unwrap_or(actual.open);

    let closes: Vec<f64> = input.iter().map(|c| c.close).collect();
    let predicted = predict_next(predictor, normalizer, &closes)?;
    let record = Reconciliation::new(actual.time, last_close, predicted, actual.close);
    info!(
        "One-step check for {} at {}: predicted {:.2}, actual {:.2}",
        pair, actual.time, record.predicted, record.actual
    );
    Ok(record)
}

/// # Summary
/// 用最近 W+H 根 K 线检验一次 H 步自回归预测。
///
/// # Logic
/// 1. 前 W 根作为初始窗口，后 H 根作为真实值。
/// 2. 自回归预测 H 步并在价格空间逐点对账。
///
/// # Returns
/// H 条对账记录，`last_close` 均为初始窗口的最后收盘价。
pub async fn horizon_check(
    source: &dyn ObservationSource,
    pair: &Pair,
    timeframe: TimeFrame,
    predictor: &dyn Predictor,
    normalizer: &Normalizer,
    horizon: usize,
) -> Result<Vec<Reconciliation>, ForecastError> {
    let w = predictor.window_size();
    let needed = w.checked_add(horizon).ok_or_else(|| too_many(w, horizon))?;
    let candles = closed_candles(source, pair, timeframe, needed).await?;
    let (seed, future) = candles.split_at(w);
    let closes: Vec<f64> = seed.iter().map(|c| c.close).collect();
    let last_close = closes.last().copied().unwrap_or_default();

    let predicted = forecast_prices(predictor, normalizer, &closes, horizon)?;
    let records: Vec<Reconciliation> = future
        .iter()
        .zip(predicted)
        .map(|(actual, p)| Reconciliation::new(actual.time, last_close, p, actual.close))
        .collect();
    info!(
        "Horizon check for {}: {} steps after {}",
        pair,
        records.len(),
        seed.last().map(|c| c.time.to_string()).unwrap_or_default()
    );
    Ok(records)
}
