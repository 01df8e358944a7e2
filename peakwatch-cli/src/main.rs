#![forbid(unsafe_code)]
#![warn(
    unused,
    unused_crate_dependencies,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]

//! `peakwatch` 命令行入口。
//!
//! * `init`：获取完整历史并从头计算
//! * `update`：增量更新并发送日报（适合每日定时任务）
//! * `serve`：启动仪表盘
//! * `report`：打印当前统计摘要
//! * `verify`：从原始收盘价重新计算并检查持久化状态

use clap::{Parser, Subcommand};
use peakwatch::{
    UpdateOutcome,
    error::PeakwatchError,
    logging::{init_json_logging, init_logging},
    statistic::summary::DrawdownSummary,
    store::file::CsvStore,
    system::{UpdateReport, builder::SystemBuilder, config::SystemConfig},
};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info};

mod dashboard;

const DEFAULT_CONFIG_PATH: &str = "peakwatch.json";

#[derive(Debug, Parser)]
#[command(name = "peakwatch", version, about = "Nasdaq-100 drawdown and section tracker")]
struct Cli {
    /// JSON 配置文件路径，文件不存在时使用默认配置。
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// 以 JSON 格式输出日志。
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 获取完整历史并从头重建时间线。
    Init,
    /// 追加新的收盘价并发送日报。
    Update {
        /// 尚无时间线时回退到全量初始化。
        #[arg(long)]
        init_if_missing: bool,
        /// 只把报告写入日志，不发送邮件。
        #[arg(long)]
        no_email: bool,
    },
    /// 启动仪表盘。
    Serve {
        /// 覆盖配置中的监听地址。
        #[arg(long)]
        bind: Option<String>,
    },
    /// 打印已持久化时间线的统计摘要。
    Report {
        /// 输出 JSON 而不是表格。
        #[arg(long)]
        json: bool,
    },
    /// 从原始收盘价重新计算并检查持久化状态。
    Verify,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Peakwatch(#[from] PeakwatchError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.json_logs {
        init_json_logging();
    } else {
        init_logging();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "peakwatch failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = SystemConfig::load(&cli.config).map_err(PeakwatchError::from)?;

    match cli.command {
        Command::Init => {
            let system = SystemBuilder::new(&config).notifications(false).build()?;
            let report = system.initialise().await?;
            print_report(&report);
        }
        Command::Update {
            init_if_missing,
            no_email,
        } => {
            let system = SystemBuilder::new(&config)
                .notifications(!no_email)
                .build()?;
            let report = if init_if_missing {
                system.update_or_initialise().await?
            } else {
                system.update().await?
            };
            print_report(&report);
        }
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.dashboard.bind.clone());
            let store = CsvStore::new(
                &config.storage.timeline,
                &config.storage.section_minimums,
            );

            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!(%bind, "dashboard listening");
            axum::serve(listener, dashboard::router(store)).await?;
        }
        Command::Report { json } => {
            let system = SystemBuilder::new(&config).notifications(false).build()?;
            let summary = system.summary()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                summary.print();
            }
        }
        Command::Verify => {
            let system = SystemBuilder::new(&config).notifications(false).build()?;
            let state = system.verify()?;
            println!(
                "OK: {} rows, {} sections match full recomputation",
                state.timeline.len(),
                state.minimums.len()
            );
        }
    }

    Ok(())
}

fn print_report(report: &UpdateReport) {
    match &report.outcome {
        UpdateOutcome::Updated { appended, .. } => println!("Appended {appended} trading day(s)."),
        UpdateOutcome::NoNewData { .. } => println!("No new data available."),
    }
    print_summary(&report.summary);

    if let Some(delivery) = &report.delivery {
        println!(
            "Report delivered to {} recipient(s), {} failed.",
            delivery.delivered,
            delivery.failed
        );
    }
}

fn print_summary(summary: &DrawdownSummary) {
    if summary.last_date.is_none() {
        println!("Timeline is empty.");
    }
    summary.print();
}
