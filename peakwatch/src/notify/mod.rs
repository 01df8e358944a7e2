//! Notify 报告通知模块
//!
//! 将 [`DrawdownSummary`] 以纯文本报告的形式发送给配置的收件人列表。
//!
//! 通知是"尽力而为"的：每个收件人单独发送，一个收件人失败不会阻塞其他收件人，
//! 失败只会被记录并计入 [`DeliveryReport`]，从不中断更新周期。

use crate::statistic::summary::DrawdownSummary;
use derive_more::Constructor;
use futures::future::join_all;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    address::AddressError,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use serde::{Deserialize, Serialize};
use std::{future::Future, time::Duration};
use thiserror::Error;
use tracing::{info, warn};

/// 纯文本报告渲染。
pub mod report;

/// 默认 SMTP 端口（STARTTLS）。
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// 单个收件人投递（连接、认证、发送）的超时时间。
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// 默认邮件主题。
pub const DEFAULT_SUBJECT: &str = "Nasdaq-100 Drawdown Daily Report";

/// 单个收件人的投递失败。
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid address {address}: {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },

    #[error("message build: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("transport: {0}")]
    Transport(String),

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),
}

/// 一次通知的投递结果。
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize, Serialize, Constructor)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// SMTP 邮件通知配置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EmailConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// 发件人地址，为空时使用 `username`。
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default = "default_subject")]
    pub subject: String,
}

fn default_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

impl EmailConfig {
    /// 发件人地址。
    pub fn sender(&self) -> &str {
        if self.from.is_empty() {
            &self.username
        } else {
            &self.from
        }
    }
}

/// 报告通知者。
pub trait Notifier {
    /// 发送报告。从不返回错误，失败计入 [`DeliveryReport`]。
    fn notify(&self, summary: &DrawdownSummary) -> impl Future<Output = DeliveryReport>;
}

/// 通过邮件传输发送报告的 [`Notifier`]，默认使用 SMTP（STARTTLS）。
#[derive(Debug, Clone)]
pub struct EmailNotifier<Transport = AsyncSmtpTransport<Tokio1Executor>> {
    transport: Transport,
    from: Mailbox,
    recipients: Vec<String>,
    subject: String,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self, DeliveryError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Self::with_transport(transport, config)
    }
}

impl<Transport> EmailNotifier<Transport>
where
    Transport: AsyncTransport + Sync,
    Transport::Error: std::fmt::Display,
{
    /// 使用给定的传输构造，发件人、收件人与主题取自 `config`。
    pub fn with_transport(transport: Transport, config: &EmailConfig) -> Result<Self, DeliveryError> {
        Ok(Self {
            transport,
            from: parse_mailbox(config.sender())?,
            recipients: config.recipients.clone(),
            subject: config.subject.clone(),
        })
    }

    async fn send(&self, recipient: &str, body: &str) -> Result<(), DeliveryError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(recipient)?)
            .subject(self.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        tokio::time::timeout(DELIVERY_TIMEOUT, self.transport.send(message))
            .await
            .map_err(|_| DeliveryError::Timeout(DELIVERY_TIMEOUT))?
            .map_err(|error| DeliveryError::Transport(error.to_string()))?;
        Ok(())
    }
}

impl<Transport> Notifier for EmailNotifier<Transport>
where
    Transport: AsyncTransport + Sync,
    Transport::Error: std::fmt::Display,
{
    async fn notify(&self, summary: &DrawdownSummary) -> DeliveryReport {
        let body = report::render(summary);

        let results = join_all(self.recipients.iter().map(|recipient| {
            let body = &body;
            async move { (recipient, self.send(recipient, body).await) }
        }))
        .await;

        let report = results
            .into_iter()
            .fold(DeliveryReport::default(), |mut report, (recipient, result)| {
                match result {
                    Ok(()) => {
                        info!(%recipient, "report delivered");
                        report.delivered += 1;
                    }
                    Err(error) => {
                        warn!(%recipient, ?error, "report delivery failed");
                        report.failed += 1;
                    }
                }
                report
            });

        info!(
            delivered = report.delivered,
            failed = report.failed,
            "report notification finished"
        );
        report
    }
}

/// 只将报告写入日志的 [`Notifier`]，用于未配置邮件时。
#[derive(Debug, Copy, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, summary: &DrawdownSummary) -> DeliveryReport {
        info!(
            report = %report::render(summary),
            "email configuration missing, report logged only"
        );
        DeliveryReport::default()
    }
}

/// 根据配置选择的 [`Notifier`]。
#[derive(Debug, Clone)]
pub enum AnyNotifier {
    Email(EmailNotifier),
    Log(LogNotifier),
}

impl AnyNotifier {
    /// 配置完整时使用 [`EmailNotifier`]，否则（或配置无效时）回退到 [`LogNotifier`]。
    ///
    /// SMTP 连接池会启动后台任务，因此必须在 Tokio 运行时内调用。
    pub fn from_config(config: Option<&EmailConfig>) -> Self {
        let Some(config) = config.filter(|config| {
            !config.host.is_empty() && !config.username.is_empty() && !config.recipients.is_empty()
        }) else {
            return Self::Log(LogNotifier);
        };

        match EmailNotifier::new(config) {
            Ok(notifier) => Self::Email(notifier),
            Err(error) => {
                warn!(?error, "invalid email configuration, report will be logged only");
                Self::Log(LogNotifier)
            }
        }
    }
}

impl Notifier for AnyNotifier {
    async fn notify(&self, summary: &DrawdownSummary) -> DeliveryReport {
        match self {
            Self::Email(notifier) => notifier.notify(summary).await,
            Self::Log(notifier) => notifier.notify(summary).await,
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|source| DeliveryError::Address {
            address: address.to_string(),
            source,
        })
}
