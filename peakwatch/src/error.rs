use crate::{
    notify::DeliveryError, statistic::error::StatisticError, store::StoreError,
    system::config::ConfigError, update::error::UpdateError,
};
use peakwatch_data::error::DataError;
use thiserror::Error;

/// Peakwatch 中生成的所有错误。
///
/// 投递失败不会经由此类型中断更新周期，[`DeliveryError`] 仅在构造通知者时出现。
#[derive(Debug, Error)]
pub enum PeakwatchError {
    #[error("update: {0}")]
    Update(#[from] UpdateError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("data: {0}")]
    Data(#[from] DataError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("statistic: {0}")]
    Statistic(#[from] StatisticError),

    #[error("delivery: {0}")]
    Delivery(#[from] DeliveryError),
}

impl PeakwatchError {
    /// 错误是否表示尚未初始化（调用方可以回退到全量初始化）。
    pub fn is_not_initialized(&self) -> bool {
        matches!(self, Self::Update(UpdateError::NotInitialized))
    }
}
