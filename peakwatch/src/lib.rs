#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # Peakwatch
//! Peakwatch 跟踪一个市场指数的收盘价历史，计算回撤（相对历史峰值的跌幅），
//! 将历史切分为峰值到峰值的"区间"（Section），并给出当前区间最小回撤在历史区间中的统计位置。
//! * **增量一致**：无论一次性处理全部历史，还是分多批增量处理新数据，结果逐位相同。
//! * **可审计**：每次更新都从原始收盘价重新推导运行峰值，而不是信任持久化的派生列。
//! * **原子持久化**：时间线和区间最小回撤表通过"写临时文件再重命名"整体替换，读者永远看不到半写状态。
//!
//! ## 概述
//! 从底层到上层，主要组件为：
//! * [`DrawdownCalculator`](statistic::metric::drawdown::DrawdownCalculator)：给定收盘价序列和延续的运行峰值，
//!   计算每个点的回撤百分比。
//! * [`SectionSegmenter`](statistic::metric::drawdown::section::SectionSegmenter)：在每个新的历史最高点开启新区间。
//! * [`SectionMinimums`](statistic::metric::drawdown::min::SectionMinimums) 与
//!   [`algorithm::percentile`](statistic::algorithm::percentile)：区间最小回撤以及百分位排名/分位数。
//! * [`update::extend`]：组合上述组件，将已持久化的时间线扩展到新观测的收盘价。
//! * [`System`](system::System)：一次完整的更新周期（获取数据、计算、持久化、发送报告）。

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Peakwatch 中生成的顶层 [`Error`](std::error::Error)。
pub mod error;

/// 日志初始化工具。
pub mod logging;

/// 报告通知（电子邮件）。
pub mod notify;

/// 回撤、区间以及百分位相关的统计算法和指标。
pub mod statistic;

/// 持久化的时间线与区间最小回撤表的平面文件存储。
pub mod store;

/// 系统配置以及完整的更新周期。
pub mod system;

/// 持久化时间线的数据模型。
pub mod timeline;

/// 增量更新编排器。
pub mod update;

/// 区间标识符。
///
/// 从 0 开始，沿时间线单调不减；每当出现新的历史最高收盘价时加 1。
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Deserialize,
    Serialize,
    Display,
    From,
)]
pub struct SectionId(pub u64);

impl SectionId {
    /// 获取区间标识符的数值。
    pub fn value(&self) -> u64 {
        self.0
    }

    /// 下一个区间的标识符。
    pub fn next(&self) -> SectionId {
        SectionId(self.0 + 1)
    }
}

/// 使用 [`FnvBuildHasher`](fnv::FnvBuildHasher) 并保持插入顺序的 [`IndexMap`](indexmap::IndexMap)。
pub type FnvIndexMap<K, V> = indexmap::IndexMap<K, V, fnv::FnvBuildHasher>;

/// 一次增量更新的结果。
///
/// 上游没有比最后已知交易日更新的数据并不是错误，而是 [`UpdateOutcome::NoNewData`]，
/// 此时先前的状态原样返回，调用方应提前结束更新周期且不写入任何内容。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum UpdateOutcome<T> {
    /// 追加了 `appended` 个新交易日。
    Updated { state: T, appended: usize },
    /// 去重后没有新数据，`state` 即为未改变的先前状态。
    NoNewData { state: T },
}

impl<T> UpdateOutcome<T> {
    /// 如果本次更新产生了新状态，返回 `true`。
    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated { .. })
    }

    pub fn state(&self) -> &T {
        match self {
            Self::Updated { state, .. } | Self::NoNewData { state } => state,
        }
    }

    pub fn into_state(self) -> T {
        match self {
            Self::Updated { state, .. } | Self::NoNewData { state } => state,
        }
    }

    /// 将状态映射为另一种类型，保留结果类别。
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> UpdateOutcome<U> {
        match self {
            Self::Updated { state, appended } => UpdateOutcome::Updated {
                state: f(state),
                appended,
            },
            Self::NoNewData { state } => UpdateOutcome::NoNewData { state: f(state) },
        }
    }
}

/// Peakwatch 核心测试工具。
///
/// 提供浮点数比较和测试序列构造等辅助函数。
pub mod test_utils {
    use chrono::NaiveDate;
    use peakwatch_data::{PricePoint, PriceSeries};

    /// 比较两个 f64 浮点数是否在 `epsilon` 容差内相等。
    ///
    /// - 两个 NaN 值被视为相等
    /// - 两个同符号的无穷大值被视为相等
    /// - 其他包含 NaN 或无穷大的情况返回 `false`
    pub fn f64_is_eq(actual: f64, expected: f64, epsilon: f64) -> bool {
        if actual.is_nan() && expected.is_nan() {
            true
        } else if actual.is_infinite() && expected.is_infinite() {
            actual.is_sign_positive() == expected.is_sign_positive()
        } else if actual.is_nan()
            || expected.is_nan()
            || actual.is_infinite()
            || expected.is_infinite()
        {
            false
        } else {
            (actual - expected).abs() < epsilon
        }
    }

    /// 测试基准日期（2024-01-01）之后第 `plus` 天。
    ///
    /// # Panics
    ///
    /// 如果日期溢出，此函数会 panic。
    pub fn date_plus_days(plus: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|base| base.checked_add_days(chrono::Days::new(plus)))
            .unwrap()
    }

    /// 使用连续日期为给定收盘价构造 [`PriceSeries`]，第一个点的日期为 `date_plus_days(offset)`。
    pub fn series_from(offset: u64, closes: &[f64]) -> PriceSeries {
        closes
            .iter()
            .enumerate()
            .map(|(index, close)| PricePoint::new(date_plus_days(offset + index as u64), *close))
            .collect()
    }
}
