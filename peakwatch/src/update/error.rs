use crate::statistic::error::StatisticError;
use peakwatch_data::error::DataError;
use thiserror::Error;

/// 增量更新过程中产生的所有错误。
#[derive(Debug, Error)]
pub enum UpdateError {
    /// 没有已持久化的时间线。调用方可以回退到全量初始化。
    #[error("no persisted timeline exists: run a from-scratch initialisation first")]
    NotInitialized,

    #[error("statistic: {0}")]
    Statistic(#[from] StatisticError),

    /// 新观测的点日期乱序、重复或包含非有限收盘价。
    #[error("invalid new points: {0}")]
    InvalidSeries(#[from] DataError),

    /// 持久化状态与从原始收盘价重新计算的结果不一致。
    #[error("corrupt timeline: {0}")]
    CorruptTimeline(String),
}
