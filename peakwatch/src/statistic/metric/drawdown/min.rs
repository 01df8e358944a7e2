//! Section Minimum Drawdown 区间最小回撤模块
//!
//! 本模块计算每个区间内观察到的最小（最负）回撤。
//!
//! 区间最小回撤表在每次更新时从整条时间线重新计算，而不是只修补最后一行：
//! 新的点可能会降低仍处于开放状态的最后一个区间的最小回撤。

use crate::{
    FnvIndexMap, SectionId,
    statistic::algorithm::HistoricalDistribution,
};
use serde::{Deserialize, Serialize};

/// 区间标识符到该区间最小回撤的映射，按区间标识符升序排列。
///
/// 每个出现过的区间恰好一项。只有一个点的区间（即只有创出新高的那个点）最小回撤为 0。
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct SectionMinimums(FnvIndexMap<SectionId, f64>);

impl SectionMinimums {
    /// 从 `(区间, 回撤)` 行计算区间最小回撤。
    ///
    /// 行可以是任意顺序；结果按区间标识符排序。
    pub fn from_rows(rows: impl IntoIterator<Item = (SectionId, f64)>) -> Self {
        let mut minimums = Self::default();
        rows.into_iter()
            .for_each(|(section, drawdown)| minimums.update(section, drawdown));
        minimums.0.sort_unstable_keys();
        minimums
    }

    /// 从"区间到回撤序列"的映射计算区间最小回撤。
    ///
    /// 回撤序列为空的区间不产生条目。
    pub fn from_sections<I>(sections: impl IntoIterator<Item = (SectionId, I)>) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        Self::from_rows(sections.into_iter().flat_map(|(section, drawdowns)| {
            drawdowns
                .into_iter()
                .map(move |drawdown| (section, drawdown))
        }))
    }

    /// 使用 `section` 中的下一个回撤更新该区间的最小回撤。
    pub fn update(&mut self, section: SectionId, drawdown: f64) {
        self.0
            .entry(section)
            .and_modify(|min| *min = min.min(drawdown))
            .or_insert(drawdown);
    }

    pub fn get(&self, section: &SectionId) -> Option<f64> {
        self.0.get(section).copied()
    }

    /// 标识符最大的区间（即当前开放的区间）及其最小回撤。
    pub fn last(&self) -> Option<(SectionId, f64)> {
        self.0.last().map(|(section, min)| (*section, *min))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionId, f64)> + '_ {
        self.0.iter().map(|(section, min)| (*section, *min))
    }

    /// 用于百分位统计的历史分布（排除恰好为 0 的最小回撤）。
    pub fn historical(&self) -> HistoricalDistribution {
        HistoricalDistribution::new(self.0.values().copied())
    }
}

/// 按原样收集已计算好的 `(区间, 最小回撤)` 表，例如从持久化存储加载时。
///
/// 重复的区间以最后一项为准。
impl FromIterator<(SectionId, f64)> for SectionMinimums {
    fn from_iter<T: IntoIterator<Item = (SectionId, f64)>>(iter: T) -> Self {
        let mut map = iter.into_iter().collect::<FnvIndexMap<_, _>>();
        map.sort_unstable_keys();
        Self(map)
    }
}
