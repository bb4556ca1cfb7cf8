use candlecast_core::common::TimeFrame;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "candlecast", about = "Short-horizon crypto price forecasting", version)]
pub struct Cli {
    /// 配置文件（不含扩展名时按 toml/json/yaml 依次查找）
    #[arg(long, global = true, env = "CANDLECAST_CONFIG", default_value = "candlecast")]
    pub config: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 合并原始 CSV，去重排序后切分为训练/验证/测试集
    Prepare(PrepareArgs),
    /// 在训练集上训练单步预测模型
    Train(TrainArgs),
    /// 在测试集上评估模型
    Validate(ValidateArgs),
    /// 用最新行情检验一次单步预测
    PredictNow(MarketArgs),
    /// 用最新行情检验一次多步自回归预测
    Forecast(ForecastArgs),
    /// 实时预测并逐分钟对账
    Live(LiveArgs),
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// 原始行情文件，至少包含 timestamp 与 close 两列
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[arg(long)]
    pub look_back: Option<usize>,
    /// 模型适用的 K 线周期，覆盖配置中的 feed.timeframe
    #[arg(long)]
    pub timeframe: Option<TimeFrame>,
    #[arg(long)]
    pub epochs: Option<usize>,
    #[arg(long)]
    pub learning_rate: Option<f64>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// 逐点结果输出文件
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MarketArgs {
    /// 交易对，覆盖配置中的 feed.symbol
    #[arg(long)]
    pub symbol: Option<String>,
}

#[derive(Args, Debug)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub market: MarketArgs,
    #[arg(long)]
    pub horizon: Option<usize>,
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LiveArgs {
    #[command(flatten)]
    pub market: MarketArgs,
    /// 会话时长（分钟）
    #[arg(long)]
    pub minutes: Option<i64>,
    /// 对账记录输出文件，默认写入数据目录
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommands() {
        let cli = Cli::parse_from(["candlecast", "live", "--minutes", "5", "--symbol", "btcusdt"]);
        match cli.command {
            Command::Live(args) => {
                assert_eq!(args.minutes, Some(5));
                assert_eq!(args.market.symbol.as_deref(), Some("btcusdt"));
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::parse_from(["candlecast", "prepare", "a.csv", "b.csv"]);
        assert!(matches!(cli.command, Command::Prepare(ref p) if p.inputs.len() == 2));
        assert!(Cli::try_parse_from(["candlecast", "prepare"]).is_err());
        assert!(matches!(
            Cli::parse_from(["candlecast", "predict-now"]).command,
            Command::PredictNow(_)
        ));
    }

    #[test]
    fn test_parse_train_timeframe() {
        let cli = Cli::parse_from(["candlecast", "train", "--timeframe", "5m", "--epochs", "3"]);
        match cli.command {
            Command::Train(args) => {
                assert_eq!(args.timeframe, Some(TimeFrame::Minute5));
                assert_eq!(args.epochs, Some(3));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["candlecast", "train", "--timeframe", "3m"]).is_err());
    }
}
