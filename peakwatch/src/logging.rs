use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// 未设置 `RUST_LOG` 时使用的日志级别。
pub const DEFAULT_LOG_FILTER: &str = "info";

/// 初始化默认的非 JSON 格式 `Peakwatch` 日志。
///
/// 日志级别从 `RUST_LOG` 读取，未设置或无效时为 [`DEFAULT_LOG_FILTER`]。
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .init()
}

/// 初始化 JSON 格式的 `Peakwatch` 日志，便于日志收集。
pub fn init_json_logging() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .init()
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}
