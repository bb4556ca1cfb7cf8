use candlecast_core::common::time::{FakeClockProvider, TimeProvider};
use candlecast_core::common::{Pair, TimeFrame};
use candlecast_core::config::LiveConfig;
use candlecast_core::forecast::error::ForecastError;
use candlecast_core::forecast::normalizer::Normalizer;
use candlecast_core::forecast::port::Predictor;
use candlecast_core::market::port::ObservationSource;
use candlecast_core::market::error::MarketError;
use candlecast_core::testing::{ClockedSource, LastValuePredictor, ScriptedSource, candle};
use candlecast_engine::live::{LiveSession, LiveSettings};
use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use futures::StreamExt;
use std::sync::Arc;

/// 价格等于 K 线开始时间距零点的分钟数，相邻 K 线恰好相差 1
fn price_at(time: DateTime<Utc>) -> f64 {
    f64::from(time.num_seconds_from_midnight() / 60)
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 30).unwrap()
}

fn settings(session_minutes: i64) -> LiveSettings {
    LiveSettings {
        timeframe: TimeFrame::Minute1,
        session: Duration::minutes(session_minutes),
        retry_backoff: Duration::seconds(60),
        settle: Duration::seconds(2),
    }
}

fn normalizer() -> Arc<Normalizer> {
    Arc::new(Normalizer::fit(&[1000.0, 1300.0]).unwrap())
}

fn session(
    source: Arc<dyn ObservationSource>,
    predictor: Arc<dyn Predictor>,
    clock: Arc<FakeClockProvider>,
    session_minutes: i64,
) -> LiveSession {
    LiveSession::new(
        source,
        predictor,
        normalizer(),
        clock,
        Pair::new("ETHUSDT"),
        settings(session_minutes),
    )
    .unwrap()
}

#[tokio::test]
async fn test_session_reconciles_every_minute_until_deadline() {
    let clock = Arc::new(FakeClockProvider::new(start()));
    let source = Arc::new(ClockedSource::new(clock.clone(), Box::new(price_at)));
    let live = session(source, Arc::new(LastValuePredictor { window: 3 }), clock.clone(), 10);

    let report = live.run(None).await.unwrap();

    // 目标 12:00 ~ 12:09，12:10 的结果要到 12:11:02 才落盘，已超过 12:10:30 的截止时间
    let targets: Vec<String> = report
        .records
        .iter()
        .map(|r| r.target_time.format("%H:%M").to_string())
        .collect();
    assert_eq!(targets.len(), 10);
    assert_eq!(targets.first().map(String::as_str), Some("12:00"));
    assert_eq!(targets.last().map(String::as_str), Some("12:09"));
    assert_eq!(report.failed_fetches, 0);
    assert!(clock.now() <= start() + Duration::minutes(10));

    // 朴素预测器：预测值等于上一根收盘价，真实值来自目标 K 线
    for record in &report.records {
        assert_eq!(record.actual, price_at(record.target_time));
        assert!((record.predicted - record.last_close).abs() < 1e-9);
        assert!((record.abs_error + 1.0).abs() < 1e-9);
    }
    assert_eq!(report.summary.count, 10);
    assert!((report.summary.mae - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_session_backs_off_on_transient_failures() {
    let clock = Arc::new(FakeClockProvider::new(start()));
    let source = Arc::new(ClockedSource::new(clock.clone(), Box::new(price_at)));
    source.fail_next(3, MarketError::Network("connection reset".into()));
    let live = session(
        source.clone(),
        Arc::new(LastValuePredictor { window: 3 }),
        clock.clone(),
        10,
    );

    let report = live.run(None).await.unwrap();

    // 三次 60 秒退避后从 12:03:30 开始，目标 12:03 ~ 12:09
    assert_eq!(report.failed_fetches, 3);
    assert_eq!(report.records.len(), 7);
    let first = report.records.first().unwrap().target_time;
    assert_eq!(first, Utc.with_ymd_and_hms(2025, 1, 1, 12, 3, 0).unwrap());
    for (i, record) in report.records.iter().enumerate() {
        assert_eq!(record.target_time, first + Duration::minutes(i64::try_from(i).unwrap()));
        assert_eq!(record.actual, price_at(record.target_time));
    }
    // 3 次失败 + 每条记录各一次预测与一次对账 + 最后一次越过截止时间的预测
    assert_eq!(source.calls(), 3 + 7 * 2 + 1);
}

#[tokio::test]
async fn test_reconciliation_failures_keep_history_intact() {
    let clock = Arc::new(FakeClockProvider::new(start()));
    let at = |m: u32| {
        Utc.with_ymd_and_hms(2025, 1, 1, 11, 57, 0).unwrap() + Duration::minutes(i64::from(m))
    };
    let window = vec![
        candle(at(0), 100.0, true),
        candle(at(1), 101.0, true),
        candle(at(2), 102.0, true),
        candle(at(3), 103.0, false),
    ];
    let settled = vec![
        candle(at(2), 102.0, true),
        candle(at(3), 110.0, true),
        candle(at(4), 111.0, false),
    ];
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(window),
        Err(MarketError::RateLimited("429".into())),
        Err(MarketError::Network("timeout".into())),
        Err(MarketError::Network("timeout".into())),
        Ok(settled),
    ]));
    let live = session(
        source.clone(),
        Arc::new(LastValuePredictor { window: 3 }),
        clock.clone(),
        5,
    );

    let report = live.run(None).await.unwrap();

    // 对账失败 3 次，脚本耗尽后又失败 2 次，期间只产生一条完整记录
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.failed_fetches, 5);
    let record = &report.records[0];
    assert_eq!(record.target_time, at(3));
    assert_eq!(record.last_close, 102.0);
    assert!((record.predicted - 102.0).abs() < 1e-9);
    assert_eq!(record.actual, 110.0);
    assert!(clock.now() < start() + Duration::minutes(5));

    // 首次请求 W+1 根；第一次对账在 12:01:02，距目标 1 个周期
    let requests = source.requests();
    assert_eq!(requests.first(), Some(&4));
    assert_eq!(requests.get(1), Some(&3));
}

#[tokio::test]
async fn test_short_session_never_waits_past_deadline() {
    let clock = Arc::new(FakeClockProvider::new(start()));
    let source = Arc::new(ClockedSource::new(clock.clone(), Box::new(price_at)));
    let live = session(source, Arc::new(LastValuePredictor { window: 5 }), clock.clone(), 1);

    let report = live.run(None).await.unwrap();

    assert_eq!(report.records.len(), 1);
    assert!(report.finished_at <= start() + Duration::minutes(1));
    assert_eq!(report.started_at, start());
}

#[tokio::test]
async fn test_session_without_time_for_any_prediction() {
    let clock = Arc::new(FakeClockProvider::new(start()));
    let source = Arc::new(ClockedSource::new(clock.clone(), Box::new(price_at)));
    let mut cfg = settings(1);
    cfg.session = Duration::seconds(20);
    let live = LiveSession::new(
        source,
        Arc::new(LastValuePredictor { window: 3 }),
        normalizer(),
        clock.clone(),
        Pair::new("ETHUSDT"),
        cfg,
    )
    .unwrap();

    let report = live.run(None).await.unwrap();

    assert!(report.records.is_empty());
    assert_eq!(report.summary.count, 0);
    assert_eq!(clock.now(), start());
}

struct BrokenPredictor;

impl Predictor for BrokenPredictor {
    fn window_size(&self) -> usize {
        3
    }

    fn predict(&self, _: &[f64]) -> Result<f64, ForecastError> {
        Err(ForecastError::Predictor("weights not loaded".into()))
    }
}

#[tokio::test]
async fn test_predictor_error_ends_session() {
    let clock = Arc::new(FakeClockProvider::new(start()));
    let source = Arc::new(ClockedSource::new(clock.clone(), Box::new(price_at)));
    let live = session(source, Arc::new(BrokenPredictor), clock, 10);

    let result = live.run(None).await;

    assert_eq!(
        result.unwrap_err(),
        ForecastError::Predictor("weights not loaded".into())
    );
}

#[tokio::test]
async fn test_invalid_settings_rejected() {
    let clock = Arc::new(FakeClockProvider::new(start()));
    let source = Arc::new(ClockedSource::new(clock.clone(), Box::new(price_at)));

    let zero_window = LiveSession::new(
        source.clone(),
        Arc::new(LastValuePredictor { window: 0 }),
        normalizer(),
        clock.clone(),
        Pair::new("ETHUSDT"),
        settings(10),
    );
    assert!(matches!(zero_window, Err(ForecastError::InvalidArgument(_))));

    let zero_session = LiveSession::new(
        source,
        Arc::new(LastValuePredictor { window: 3 }),
        normalizer(),
        clock,
        Pair::new("ETHUSDT"),
        settings(0),
    );
    assert!(matches!(zero_session, Err(ForecastError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_spawned_session_streams_records() {
    let clock = Arc::new(FakeClockProvider::new(start()));
    let source = Arc::new(ClockedSource::new(clock.clone(), Box::new(price_at)));
    let live = session(source, Arc::new(LastValuePredictor { window: 3 }), clock, 4);

    let (stream, handle) = live.spawn();
    let streamed: Vec<_> = stream.collect().await;
    let report = handle.await.unwrap().unwrap();

    assert_eq!(streamed.len(), 4);
    assert_eq!(streamed, report.records);
}

#[tokio::test]
async fn test_oversized_session_is_rejected_without_panicking() {
    let clock = Arc::new(FakeClockProvider::new(start()));
    let source = Arc::new(ClockedSource::new(clock.clone(), Box::new(price_at)));

    // 分钟数本身可以表示，但截止时间超出日期范围
    let config = LiveConfig {
        session_minutes: 1_000_000_000_000,
        ..LiveConfig::default()
    };
    let live = LiveSession::new(
        source.clone(),
        Arc::new(LastValuePredictor { window: 3 }),
        normalizer(),
        clock.clone(),
        Pair::new("ETHUSDT"),
        LiveSettings::from_config(&config, TimeFrame::Minute1).unwrap(),
    )
    .unwrap();
    assert!(matches!(live.run(None).await, Err(ForecastError::InvalidArgument(_))));
    assert_eq!(source.calls(), 0);

    // 分钟数或秒数无法表示为时长
    for config in [
        LiveConfig {
            session_minutes: i64::MAX,
            ..LiveConfig::default()
        },
        LiveConfig {
            retry_backoff_secs: i64::MAX,
            ..LiveConfig::default()
        },
        LiveConfig {
            settle_secs: i64::MIN,
            ..LiveConfig::default()
        },
    ] {
        assert!(matches!(
            LiveSettings::from_config(&config, TimeFrame::Minute1),
            Err(ForecastError::InvalidArgument(_))
        ));
    }
}

#[tokio::test]
async fn test_huge_settle_delay_ends_session_cleanly() {
    let clock = Arc::new(FakeClockProvider::new(start()));
    let source = Arc::new(ClockedSource::new(clock.clone(), Box::new(price_at)));
    let mut cfg = settings(10);
    cfg.settle = Duration::MAX;
    let live = LiveSession::new(
        source,
        Arc::new(LastValuePredictor { window: 3 }),
        normalizer(),
        clock.clone(),
        Pair::new("ETHUSDT"),
        cfg,
    )
    .unwrap();

    let report = live.run(None).await.unwrap();

    assert!(report.records.is_empty());
    assert_eq!(clock.now(), start());
}
