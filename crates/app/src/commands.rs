use crate::cli::{ForecastArgs, LiveArgs, MarketArgs, PrepareArgs, TrainArgs, ValidateArgs};
use crate::report;
use candlecast_core::common::Pair;
use candlecast_core::common::time::RealTimeProvider;
use candlecast_core::config::AppConfig;
use candlecast_core::forecast::entity::{ErrorSummary, Reconciliation};
use candlecast_engine::check::{horizon_check, predict_now};
use candlecast_engine::evaluate::evaluate;
use candlecast_engine::live::{LiveSession, LiveSettings};
use candlecast_feed::binance::BinanceProvider;
use candlecast_model::artifact::ModelArtifact;
use candlecast_model::trainer::{TrainParams, Trainer, prepare_samples};
use candlecast_store::config::resolve;
use candlecast_store::dataset::{SplitPaths, prepare};
use candlecast_store::report::write_reconciliations;
use candlecast_store::series::load_series;
use chrono::Utc;
use futures::StreamExt;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub type CommandResult = Result<(), Box<dyn Error>>;

/// 合并原始文件并切分数据集
pub fn run_prepare(config: &AppConfig, args: &PrepareArgs) -> CommandResult {
    let paths = SplitPaths {
        train: resolve(&config.data.train_file),
        validation: resolve(&config.data.validation_file),
        test: resolve(&config.data.test_file),
    };
    let parts = prepare(
        &args.inputs,
        &resolve(&config.data.cleaned_file),
        &paths,
        config.split.train_ratio,
        config.split.validation_ratio,
    )?;
    println!(
        "Prepared {} train, {} validation, {} test rows",
        parts.train.len(),
        parts.validation.len(),
        parts.test.len()
    );
    Ok(())
}

/// # Summary
/// 训练并保存模型。
///
/// # Logic
/// 1. 读取训练集与验证集，只在训练集上拟合归一化器。
/// 2. 小批量梯度下降训练，保留验证损失最低的权重。
/// 3. 将预测器、归一化器与损失历史一起写入模型文件。
pub fn run_train(config: &AppConfig, args: &TrainArgs) -> CommandResult {
    let look_back = args.look_back.unwrap_or(config.forecast.look_back);
    let mut params = TrainParams::from(&config.train);
    if let Some(epochs) = args.epochs {
        params.epochs = epochs;
    }
    if let Some(lr) = args.learning_rate {
        params.learning_rate = lr;
    }

    let train = load_series(&resolve(&config.data.train_file))?;
    let validation = load_series(&resolve(&config.data.validation_file))?;
    let data = prepare_samples(&train, &validation, look_back)?;
    let outcome = Trainer::new(params)?.fit(&data.train, &data.validation)?;

    let artifact = ModelArtifact {
        symbol: Pair::new(&config.feed.symbol).symbol,
        timeframe: args.timeframe.unwrap_or(config.feed.timeframe),
        look_back,
        normalizer: data.normalizer,
        predictor: outcome.predictor,
        created_at: Utc::now(),
        history: outcome.history,
    };
    artifact.save(&resolve(&config.data.model_file))?;
    println!(
        "Trained look-back {} model: best validation loss {:.6} at epoch {}",
        look_back, outcome.best_loss, outcome.best_epoch
    );
    Ok(())
}

/// 在测试集上评估已保存的模型
pub fn run_validate(config: &AppConfig, args: &ValidateArgs) -> CommandResult {
    let artifact = ModelArtifact::load(&resolve(&config.data.model_file))?;
    let test = load_series(&resolve(&config.data.test_file))?;
    let evaluation = evaluate(&artifact.predictor, &artifact.normalizer, &test)?;

    report::print_summary("Test", &evaluation.summary);
    if let Some(output) = &args.output {
        write_reconciliations(output, &evaluation.points)?;
        info!("Per-point results written to {}", output.display());
    }
    Ok(())
}

/// 用最新行情检验一次单步预测
pub async fn run_predict_now(config: &AppConfig, args: &MarketArgs) -> CommandResult {
    let (artifact, pair) = load_model(config, args)?;
    let source = binance(config)?;
    let record = predict_now(
        &source,
        &pair,
        artifact.timeframe,
        &artifact.predictor,
        &artifact.normalizer,
    )
    .await?;
    report::print_records(std::slice::from_ref(&record));
    Ok(())
}

/// 用最新行情检验一次 H 步自回归预测
pub async fn run_forecast(config: &AppConfig, args: &ForecastArgs) -> CommandResult {
    let (artifact, pair) = load_model(config, &args.market)?;
    let horizon = args.horizon.unwrap_or(config.forecast.horizon);
    let source = binance(config)?;
    let records = horizon_check(
        &source,
        &pair,
        artifact.timeframe,
        &artifact.predictor,
        &artifact.normalizer,
        horizon,
    )
    .await?;

    report::print_records(&records);
    report::print_summary("Forecast", &ErrorSummary::from_records(&records));
    if let Some(output) = &args.output {
        write_reconciliations(output, &records)?;
    }
    Ok(())
}

/// # Summary
/// 运行实时预测会话。
///
/// # Logic
/// 1. 会话在后台任务中运行，本函数消费记录流并逐条打印。
/// 2. 收到 Ctrl-C 时终止会话，已收到的记录照常落盘。
/// 3. 会话结束后打印汇总并写出对账文件。
pub async fn run_live(config: &AppConfig, args: &LiveArgs) -> CommandResult {
    let (artifact, pair) = load_model(config, &args.market)?;
    let mut live_config = config.live.clone();
    if let Some(minutes) = args.minutes {
        live_config.session_minutes = minutes;
    }
    let settings = LiveSettings::from_config(&live_config, artifact.timeframe)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| resolve(format!("live_{}.csv", Utc::now().format("%Y%m%d_%H%M%S"))));

    let session = LiveSession::new(
        Arc::new(binance(config)?),
        Arc::new(artifact.predictor),
        Arc::new(artifact.normalizer),
        Arc::new(RealTimeProvider),
        pair,
        settings,
    )?;
    let (mut stream, handle) = session.spawn();

    let mut received: Vec<Reconciliation> = Vec::new();
    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(record) => {
                    println!("{}", report::record_line(&record));
                    received.push(record);
                }
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal?;
                warn!("Interrupted, stopping live session with {} records", received.len());
                handle.abort();
                write_reconciliations(&output, &received)?;
                report::print_summary("Live (interrupted)", &ErrorSummary::from_records(&received));
                return Ok(());
            }
        }
    }

    let session_report = handle.await??;
    report::print_session(&session_report);
    write_reconciliations(&output, &session_report.records)?;
    info!("Session records written to {}", output.display());
    Ok(())
}

fn binance(config: &AppConfig) -> Result<BinanceProvider, Box<dyn Error>> {
    Ok(BinanceProvider::new(
        &config.feed.base_url,
        Duration::from_secs(config.feed.timeout_secs),
    )?)
}

// 读取模型并确定交易对，命令行参数优先于配置
fn load_model(
    config: &AppConfig,
    args: &MarketArgs,
) -> Result<(ModelArtifact, Pair), Box<dyn Error>> {
    let artifact = ModelArtifact::load(&resolve(&config.data.model_file))?;
    let pair = Pair::new(args.symbol.as_deref().unwrap_or(&config.feed.symbol));
    if pair.symbol != artifact.symbol {
        warn!(
            "Model was trained on {} but is applied to {}",
            artifact.symbol, pair.symbol
        );
    }
    Ok((artifact, pair))
}
