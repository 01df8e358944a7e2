//! SystemConfig 系统配置模块
//!
//! 本模块提供了用于配置 Peakwatch 系统组件的数据结构：
//! 持久化文件路径、收盘价数据源、邮件通知以及仪表盘监听地址。
//!
//! # 核心概念
//!
//! - **SystemConfig**: 完整系统的顶级配置，从 JSON 文件加载，再应用环境变量覆盖
//! - **StorageConfig**: 时间线与区间最小回撤表的文件路径
//! - **SourceConfig**: 收盘价数据源（Yahoo Finance 或本地 CSV）
//! - **DashboardConfig**: 仪表盘 HTTP 服务配置

use crate::notify::{DEFAULT_SMTP_PORT, DEFAULT_SUBJECT, EmailConfig};
use chrono::NaiveDate;
use peakwatch_data::{
    AnyPriceSource,
    error::DataError,
    file::CsvPriceSource,
    yahoo::{SYMBOL_NASDAQ_100, YahooChart},
};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info};

/// 发件人地址（同时作为 SMTP 用户名）。
pub const ENV_SENDER_EMAIL: &str = "SENDER_EMAIL";

/// SMTP 密码（应用专用密码）。
pub const ENV_SENDER_PASSWORD: &str = "SENDER_PASSWORD";

/// 逗号分隔的收件人列表。
pub const ENV_RECEIVER_EMAIL: &str = "RECEIVER_EMAIL";

/// 仅通过环境变量配置邮件时使用的 SMTP 服务器。
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// 加载配置时产生的错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config JSON {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// 完整系统的顶级配置。
///
/// # 使用示例
///
/// ```json
/// {
///     "storage": {
///         "timeline": "data/nasdaq100_data.csv",
///         "section_minimums": "data/min_dd_per_section.csv"
///     },
///     "source": { "kind": "yahoo", "symbol": "^NDX", "start": "1900-01-01" },
///     "notification": {
///         "host": "smtp.gmail.com",
///         "username": "sender@example.com",
///         "password": "app-password",
///         "recipients": ["a@example.com", "b@example.com"]
///     },
///     "dashboard": { "bind": "0.0.0.0:5000" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub notification: Option<EmailConfig>,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// 持久化文件路径。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageConfig {
    pub timeline: PathBuf,
    pub section_minimums: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            timeline: PathBuf::from("data/nasdaq100_data.csv"),
            section_minimums: PathBuf::from("data/min_dd_per_section.csv"),
        }
    }
}

/// 收盘价数据源配置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    Yahoo {
        #[serde(default = "default_symbol")]
        symbol: String,
        /// 全量历史的起始日期。
        #[serde(default = "default_start")]
        start: NaiveDate,
    },
    Csv {
        path: PathBuf,
    },
}

fn default_symbol() -> String {
    SYMBOL_NASDAQ_100.to_string()
}

fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Yahoo {
            symbol: default_symbol(),
            start: default_start(),
        }
    }
}

impl SourceConfig {
    /// 构造配置的 [`AnyPriceSource`]。
    pub fn build(&self) -> Result<AnyPriceSource, DataError> {
        match self {
            Self::Yahoo { symbol, start } => {
                YahooChart::new(symbol.as_str(), *start).map(AnyPriceSource::Yahoo)
            }
            Self::Csv { path } => Ok(AnyPriceSource::File(CsvPriceSource::new(path))),
        }
    }
}

/// 仪表盘 HTTP 服务配置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DashboardConfig {
    pub bind: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
        }
    }
}

impl SystemConfig {
    /// 从 JSON 文件加载配置并应用环境变量覆盖。
    ///
    /// 文件不存在时使用默认配置。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let config = match File::open(path) {
            Ok(file) => serde_json::from_reader(BufReader::new(file)).map_err(|source| {
                ConfigError::Json {
                    path: path.to_path_buf(),
                    source,
                }
            })?,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        config
            .apply_env_from(|key| std::env::var(key).ok())
            .validate()
    }

    /// 应用环境变量覆盖：`SENDER_EMAIL`、`SENDER_PASSWORD`、`RECEIVER_EMAIL`。
    ///
    /// 只要设置了任意一个变量，且文件中没有邮件配置，就以默认 SMTP 服务器创建一份。
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let sender = lookup(ENV_SENDER_EMAIL).filter(|value| !value.trim().is_empty());
        let password = lookup(ENV_SENDER_PASSWORD).filter(|value| !value.is_empty());
        let recipients = lookup(ENV_RECEIVER_EMAIL).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|recipient| !recipient.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        });

        if sender.is_none() && password.is_none() && recipients.is_none() {
            return self;
        }

        let notification = self.notification.get_or_insert_with(|| EmailConfig {
            host: DEFAULT_SMTP_HOST.to_string(),
            port: DEFAULT_SMTP_PORT,
            username: String::new(),
            password: String::new(),
            from: String::new(),
            recipients: Vec::new(),
            subject: DEFAULT_SUBJECT.to_string(),
        });

        if let Some(sender) = sender {
            let sender = sender.trim().to_string();
            notification.username = sender.clone();
            notification.from = sender;
        }
        if let Some(password) = password {
            notification.password = password;
        }
        if let Some(recipients) = recipients {
            notification.recipients = recipients;
        }

        debug!(
            recipients = notification.recipients.len(),
            "applied notification environment overrides"
        );
        self
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.storage.timeline == self.storage.section_minimums {
            return Err(ConfigError::Invalid(format!(
                "timeline and section minimum stores share the path {}",
                self.storage.timeline.display()
            )));
        }

        if let Some(notification) = &self.notification {
            if notification.port == 0 {
                return Err(ConfigError::Invalid("SMTP port must be non-zero".to_string()));
            }
        }

        Ok(self)
    }
}
