use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 统计计算中可能发生的所有错误。
///
/// ## 错误分类
///
/// - **Degenerate**: 运行峰值不为正（或收盘价不是有限值），回撤无定义。
///   对本次计算是致命的，绝不能把 NaN/Infinity 写入持久化状态。
/// - **EmptyHistory**: 在排除 0 之后历史分布为空，分位数无定义。
/// - **InvalidQuantile**: 请求的分位点不在 `[0, 1]` 内。
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Deserialize, Serialize, Error)]
pub enum StatisticError {
    #[error("degenerate input: running peak {peak} at close {close} yields undefined drawdown")]
    Degenerate { peak: f64, close: f64 },

    #[error("historical distribution is empty after excluding zero minimums")]
    EmptyHistory,

    #[error("quantile {0} is outside [0, 1]")]
    InvalidQuantile(f64),
}
