//! Section 区间划分模块
//!
//! 区间（Section）是两个相邻历史最高点之间的连续时间段。每当收盘价严格高于此前的运行峰值时，
//! 该点开启一个新区间，区间标识符加 1。

use crate::{SectionId, statistic::metric::drawdown::RunningPeak};
use derive_more::Constructor;
use serde::{Deserialize, Serialize};

/// 单个点的区间归属。
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Deserialize, Serialize, Constructor)]
pub struct SectionAssignment {
    /// 该点所属的区间。
    pub section: SectionId,
    /// 该点是否创出新高（即开启了 `section`）。
    pub is_new_peak: bool,
}

/// 区间划分器。
///
/// 与 [`DrawdownCalculator`](super::DrawdownCalculator) 同步推进同一个运行峰值：
/// - `close > peak`：区间标识符加 1，峰值更新为 `close`
/// - 否则：区间与峰值保持不变（等于峰值的收盘价延续当前区间，回撤为 0）
///
/// 全量计算时没有延续的区间（`None`），第一个正收盘价总是开启区间 0。
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
pub struct SectionSegmenter {
    peak: RunningPeak,
    section: Option<SectionId>,
}

impl SectionSegmenter {
    /// 从延续的运行峰值和区间标识符初始化 [`SectionSegmenter`]。
    pub fn init(initial_peak: f64, initial_section: Option<SectionId>) -> Self {
        Self {
            peak: RunningPeak::new(initial_peak),
            section: initial_section,
        }
    }

    pub fn peak(&self) -> f64 {
        self.peak.value()
    }

    /// 当前所在区间（尚未观察任何点时为 `None`）。
    pub fn section(&self) -> Option<SectionId> {
        self.section
    }

    /// 使用下一个收盘价更新划分器，返回该点的 [`SectionAssignment`]。
    pub fn update(&mut self, close: f64) -> SectionAssignment {
        let is_new_peak = self.peak.observe(close);

        let section = match (is_new_peak, self.section) {
            (true, Some(current)) => current.next(),
            (_, Some(current)) => current,
            (_, None) => SectionId(0),
        };
        self.section = Some(section);

        SectionAssignment::new(section, is_new_peak)
    }

    /// 划分整个收盘价序列。
    ///
    /// # 返回值
    ///
    /// 返回每个点的 [`SectionAssignment`] 以及最终的运行峰值。
    pub fn segment(
        closes: &[f64],
        initial_peak: f64,
        initial_section: Option<SectionId>,
    ) -> (Vec<SectionAssignment>, f64) {
        let mut segmenter = Self::init(initial_peak, initial_section);

        let assignments = closes
            .iter()
            .map(|close| segmenter.update(*close))
            .collect();

        (assignments, segmenter.peak())
    }
}
