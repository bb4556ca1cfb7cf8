//! 供下游 crate 测试使用的脚本化数据源与预测器。

use crate::common::time::{FakeClockProvider, TimeProvider};
use crate::common::{Pair, TimeFrame};
use crate::forecast::error::ForecastError;
use crate::forecast::port::Predictor;
use crate::market::entity::Candle;
use crate::market::error::MarketError;
use crate::market::port::ObservationSource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// 由收盘价构造一根 K 线。
pub fn candle(time: DateTime<Utc>, close: f64, is_final: bool) -> Candle {
    Candle {
        time,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1.0,
        is_final,
    }
}

/// # Summary
/// 按预设脚本依次返回结果的数据源。脚本耗尽后返回 `NotFound`。
#[derive(Default)]
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<Candle>, MarketError>>>,
    requests: Mutex<Vec<usize>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Vec<Candle>, MarketError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 每次调用时请求的 `count`
    pub fn requests(&self) -> Vec<usize> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ObservationSource for ScriptedSource {
    async fn fetch_latest(
        &self,
        _: &Pair,
        _: TimeFrame,
        count: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(count);
        }
        self.script
            .lock()
            .map_err(|e| MarketError::Network(e.to_string()))?
            .pop_front()
            .unwrap_or_else(|| Err(MarketError::NotFound("script exhausted".into())))
    }
}

type PriceFn = Box<dyn Fn(DateTime<Utc>) -> f64 + Send + Sync>;

/// # Summary
/// 跟随虚拟时钟生成 K 线的模拟交易所，可注入连续失败。
///
/// # Invariants
/// - 返回的最后一根 K 线是当前时钟所在周期（未收盘）。
/// - 每个待注入的失败消耗一次调用。
pub struct ClockedSource {
    clock: Arc<FakeClockProvider>,
    price: PriceFn,
    failures: Mutex<VecDeque<MarketError>>,
    calls: Mutex<usize>,
}

impl ClockedSource {
    pub fn new(clock: Arc<FakeClockProvider>, price: PriceFn) -> Self {
        Self {
            clock,
            price,
            failures: Mutex::new(VecDeque::new()),
            calls: Mutex::new(0),
        }
    }

    /// 令接下来的 `n` 次调用失败
    pub fn fail_next(&self, n: usize, error: MarketError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.extend(std::iter::repeat_n(error, n));
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or_default()
    }
}

#[async_trait]
impl ObservationSource for ClockedSource {
    async fn fetch_latest(
        &self,
        _: &Pair,
        timeframe: TimeFrame,
        count: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        let injected = self
            .failures
            .lock()
            .map_err(|e| MarketError::Network(e.to_string()))?
            .pop_front();
        if let Some(err) = injected {
            return Err(err);
        }

        let now = self.clock.now();
        let step = timeframe.duration();
        let step_secs = step.num_seconds().max(1);
        let floored = now.timestamp() - now.timestamp().rem_euclid(step_secs);
        let current = DateTime::<Utc>::from_timestamp(floored, 0)
            .ok_or_else(|| MarketError::Parse("timestamp out of range".into()))?;

        let mut candles = Vec::with_capacity(count);
        let mut time = current;
        for _ in 0..count {
            candles.push(candle(time, (self.price)(time), time + step <= now));
            time -= step;
        }
        candles.reverse();
        Ok(candles)
    }
}

/// # Summary
/// 返回窗口最后一个值的朴素预测器（随机游走基线）。
pub struct LastValuePredictor {
    pub window: usize,
}

impl Predictor for LastValuePredictor {
    fn window_size(&self) -> usize {
        self.window
    }

    fn predict(&self, window: &[f64]) -> Result<f64, ForecastError> {
        if window.len() != self.window {
            return Err(ForecastError::InvalidArgument(format!(
                "expected window of {}, got {}",
                self.window,
                window.len()
            )));
        }
        window
            .last()
            .copied()
            .ok_or_else(|| ForecastError::Predictor("empty window".into()))
    }
}

type WindowFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// # Summary
/// 由闭包驱动的预测器，并记录每次收到的窗口。
pub struct FnPredictor {
    window: usize,
    f: WindowFn,
    seen: Mutex<Vec<Vec<f64>>>,
}

impl FnPredictor {
    pub fn new(window: usize, f: WindowFn) -> Self {
        Self {
            window,
            f,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// 依调用顺序返回收到过的窗口
    pub fn seen(&self) -> Vec<Vec<f64>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Predictor for FnPredictor {
    fn window_size(&self) -> usize {
        self.window
    }

    fn predict(&self, window: &[f64]) -> Result<f64, ForecastError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(window.to_vec());
        }
        Ok((self.f)(window))
    }
}
