use std::time::Duration;
use thiserror::Error;

/// 获取或解析收盘价数据时可能发生的所有错误。
#[derive(Debug, Error)]
pub enum DataError {
    /// HTTP 传输失败。
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// 上游返回非成功状态码。
    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// 上游在响应体中报告错误。
    #[error("upstream error {code}: {description}")]
    Upstream { code: String, description: String },

    /// 请求超时。
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列未通过 [`Validator`](crate::Validator) 检查。
    #[error("invalid price series: {0}")]
    InvalidSeries(String),
}
