use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// # Summary
/// 初始化全局日志，默认级别 `candlecast=info`，可由 `RUST_LOG` 覆盖。
///
/// # Returns
/// 非阻塞写入器的守卫，必须持有到进程退出，否则缓冲中的日志会丢失。
pub fn init() -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("candlecast=info,warn"));
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(false)
        .try_init()
        .is_err()
    {
        eprintln!("global tracing subscriber already installed");
    }
    guard
}
