use anyhow::Result;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 日志配置
pub struct LoggerConfig {
    /// 日志目录
    pub log_dir: String,
    /// 日志文件名前缀
    pub file_prefix: String,
    /// 保留的日志文件数量（按天滚动）
    pub max_files: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            file_prefix: "account_backend".to_string(),
            max_files: 7,
        }
    }
}

const DEFAULT_FILTER: &str = "account_backend=debug,tower_http=debug";

/// 初始化日志系统
///
/// - 同时输出到控制台和文件
/// - 日志文件按天滚动，超过 `max_files` 的旧文件自动删除
/// - 时间使用东八区
pub fn init_logger(config: LoggerConfig) -> Result<()> {
    std::fs::create_dir_all(&config.log_dir)?;

    let timer = tracing_subscriber::fmt::time::OffsetTime::new(
        time::UtcOffset::from_hms(8, 0, 0)?,
        time::format_description::well_known::Rfc3339,
    );

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .max_log_files(config.max_files)
        .build(&config.log_dir)?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    // 文件输出层（不带颜色代码）
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_timer(timer.clone())
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    // 控制台输出层
    let console_layer = tracing_subscriber::fmt::layer()
        .with_timer(timer)
        .with_target(true)
        .with_thread_ids(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggerConfig::default();
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.file_prefix, "account_backend");
        assert_eq!(config.max_files, 7);
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }
}
