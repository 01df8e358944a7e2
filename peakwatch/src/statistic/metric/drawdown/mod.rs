//! Drawdown 回撤模块
//!
//! 本模块提供了 Drawdown（回撤）的计算逻辑。
//! 回撤是当前收盘价相对历史最高收盘价（运行峰值）的百分比跌幅，是衡量下行波动率的指标。
//!
//! # 核心概念
//!
//! - **RunningPeak**: 运行峰值，截至当前点（包含）观察到的最高收盘价
//! - **DrawdownCalculator**: 回撤计算器，延续运行峰值并计算每个点的回撤
//! - **SectionSegmenter**: 区间划分器，在每个新的历史最高点开启新区间
//! - **SectionMinimums**: 每个区间内的最小回撤
//!
//! # 参考文档
//!
//! <https://www.investopedia.com/terms/d/drawdown.asp>

use crate::statistic::error::StatisticError;
use serde::{Deserialize, Serialize};

/// 区间最小回撤计算逻辑。
pub mod min;

/// 区间划分逻辑。
pub mod section;

/// 运行峰值。
///
/// 截至当前点（包含）观察到的最高收盘价，沿时间线单调不减：
/// `peak[t] = max(peak[t-1], close[t])`。
///
/// [`DrawdownCalculator`] 与 [`SectionSegmenter`](section::SectionSegmenter) 共用此类型推进峰值，
/// 两者使用相同的种子和相同的比较（严格 `>`），因此回撤为 0 的点与新区间的起点总是一致。
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
pub struct RunningPeak(f64);

impl RunningPeak {
    /// 以 `initial_peak` 为种子构造运行峰值（全量计算时为 0）。
    pub fn new(initial_peak: f64) -> Self {
        Self(initial_peak)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// 观察下一个收盘价，返回它是否创出新高（`close > peak`）。
    ///
    /// 等于当前峰值的收盘价不算新高。
    pub fn observe(&mut self, close: f64) -> bool {
        let is_new_peak = close > self.0;
        if is_new_peak {
            self.0 = close;
        }
        is_new_peak
    }
}

/// 回撤计算器。
///
/// 维护运行峰值，为每个收盘价计算回撤百分比：
///
/// `drawdown = (close - peak) / peak * 100`
///
/// 回撤总是 `<= 0`，并且恰好在新的历史最高点处等于 0。
///
/// ## 退化输入
///
/// 如果更新后的峰值不是正的有限值（例如全部为 0 的价格），回撤没有定义。
/// 此时返回 [`StatisticError::Degenerate`]，计算器状态保持不变，绝不会产生 NaN 或无穷大。
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
pub struct DrawdownCalculator {
    peak: RunningPeak,
}

impl DrawdownCalculator {
    /// 从延续的运行峰值初始化 [`DrawdownCalculator`]。
    ///
    /// # 参数
    ///
    /// - `initial_peak`: 全量计算时为 0；增量计算时为已持久化时间线的最高收盘价
    pub fn init(initial_peak: f64) -> Self {
        Self {
            peak: RunningPeak::new(initial_peak),
        }
    }

    /// 当前运行峰值。
    pub fn peak(&self) -> f64 {
        self.peak.value()
    }

    /// 使用下一个收盘价更新运行峰值，并返回该点的回撤百分比。
    ///
    /// # 错误
    ///
    /// 收盘价不是有限值，或更新后的峰值不是正数时返回 [`StatisticError::Degenerate`]。
    pub fn update(&mut self, close: f64) -> Result<f64, StatisticError> {
        let mut next = self.peak;
        next.observe(close);

        let peak = next.value();
        if !close.is_finite() || !peak.is_finite() || peak <= 0.0 {
            return Err(StatisticError::Degenerate { peak, close });
        }

        self.peak = next;
        Ok((close - peak) / peak * 100.0)
    }

    /// 计算整个收盘价序列的回撤。
    ///
    /// # 返回值
    ///
    /// 返回每个点的回撤以及最终的运行峰值。
    pub fn compute(closes: &[f64], initial_peak: f64) -> Result<(Vec<f64>, f64), StatisticError> {
        let mut calculator = Self::init(initial_peak);

        let drawdowns = closes
            .iter()
            .map(|close| calculator.update(*close))
            .collect::<Result<Vec<_>, _>>()?;

        Ok((drawdowns, calculator.peak()))
    }
}
