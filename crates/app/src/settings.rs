use candlecast_core::config::AppConfig;
use config::{Config, ConfigError, Environment, File};

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 1. 读取可选的配置文件 `name`（不存在时跳过）。
/// 2. 叠加 `CANDLECAST__SECTION__KEY` 形式的环境变量。
///
/// # Arguments
/// * `name`: 配置文件路径，可省略扩展名。
///
/// # Returns
/// 合并后的配置，未出现的字段取默认值；格式或类型错误返回 `ConfigError`。
pub fn load(name: &str) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(File::with_name(name).required(false))
        .add_source(
            Environment::with_prefix("CANDLECAST")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
