//! Algorithm 统计算法模块
//!
//! 本模块提供了用于分析历史区间最小回撤分布的统计算法。
//!
//! # 核心概念
//!
//! - **百分位排名**: 历史分布中小于等于给定值的比例（0-100）
//! - **分位数**: 历史分布中给定比例所对应的值（线性插值）
//! - **HistoricalDistribution**: 已排除 0 值并排序的历史区间最小回撤分布

use crate::statistic::error::StatisticError;
use serde::{Deserialize, Serialize};

/// 百分位排名与分位数的纯函数集合。
///
/// 两个函数都不关心输入是否已排除 0 值；排除规则由 [`HistoricalDistribution`] 负责。
///
/// # 使用示例
///
/// ```rust
/// use peakwatch::statistic::algorithm::percentile;
///
/// let historical = [-5.0, -10.0, -15.0, -20.0];
///
/// assert_eq!(percentile::rank(&historical, -12.0), 50.0);
/// assert_eq!(percentile::quantile(&historical, 0.5).unwrap(), -12.5);
/// ```
pub mod percentile {
    use crate::statistic::error::StatisticError;

    /// 没有历史可比较时的百分位排名。
    ///
    /// 这是退化输入的约定（"没有历史即处于极端位置"），而不是一般意义上的统计百分位。
    pub const RANK_EMPTY_HISTORY: f64 = 100.0;

    /// 计算 `value` 在 `historical` 中的百分位排名。
    ///
    /// ## 公式
    ///
    /// `rank = count(h <= value) / len(historical) * 100`
    ///
    /// 比较是包含性的（`<=`）。
    ///
    /// # 返回值
    ///
    /// 返回 `[0, 100]` 内的值；`historical` 为空时返回 [`RANK_EMPTY_HISTORY`]。
    pub fn rank(historical: &[f64], value: f64) -> f64 {
        if historical.is_empty() {
            return RANK_EMPTY_HISTORY;
        }

        let at_or_below = historical.iter().filter(|h| **h <= value).count();
        at_or_below as f64 / historical.len() as f64 * 100.0
    }

    /// 计算 `historical` 的 `q` 分位数（线性插值）。
    ///
    /// ## 公式
    ///
    /// 将数据升序排列为 `x[0..n]`，令 `h = (n - 1) * q`，`lo = floor(h)`：
    ///
    /// `quantile = x[lo] + (h - lo) * (x[lo + 1] - x[lo])`
    ///
    /// # 错误
    ///
    /// - `historical` 为空：[`StatisticError::EmptyHistory`]
    /// - `q` 不在 `[0, 1]` 内：[`StatisticError::InvalidQuantile`]
    pub fn quantile(historical: &[f64], q: f64) -> Result<f64, StatisticError> {
        if !(0.0..=1.0).contains(&q) {
            return Err(StatisticError::InvalidQuantile(q));
        }

        let mut sorted = historical.to_vec();
        sorted.sort_by(f64::total_cmp);

        quantile_sorted(&sorted, q)
    }

    /// [`quantile`] 的已排序输入版本。
    pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> Result<f64, StatisticError> {
        if !(0.0..=1.0).contains(&q) {
            return Err(StatisticError::InvalidQuantile(q));
        }

        let last = sorted.len().checked_sub(1).ok_or(StatisticError::EmptyHistory)?;

        let h = last as f64 * q;
        let lo = h.floor() as usize;
        let hi = (lo + 1).min(last);
        let fraction = h - lo as f64;

        Ok(sorted[lo] + fraction * (sorted[hi] - sorted[lo]))
    }
}

/// 历史区间最小回撤的分布。
///
/// 构造时排除恰好为 0 的值：每个区间的第一个点按定义回撤为 0，只有一个点的区间
/// 最小回撤也是 0，把它们计入分布会把低百分位压向 0。非有限值同样被排除。
///
/// 内部数据保持升序，便于多次查询分位数。
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct HistoricalDistribution {
    sorted: Vec<f64>,
}

impl HistoricalDistribution {
    /// 从区间最小回撤构造分布，排除 0 值。
    pub fn new(minimums: impl IntoIterator<Item = f64>) -> Self {
        let mut sorted = minimums
            .into_iter()
            .filter(|value| value.is_finite() && *value != 0.0)
            .collect::<Vec<_>>();
        sorted.sort_by(f64::total_cmp);

        Self { sorted }
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    /// 升序排列的分布值。
    pub fn values(&self) -> &[f64] {
        &self.sorted
    }

    /// `value` 在分布中的百分位排名，参见 [`percentile::rank`]。
    pub fn percentile_rank(&self, value: f64) -> f64 {
        percentile::rank(&self.sorted, value)
    }

    /// 分布的 `q` 分位数，参见 [`percentile::quantile`]。
    pub fn quantile(&self, q: f64) -> Result<f64, StatisticError> {
        percentile::quantile_sorted(&self.sorted, q)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::f64_is_eq;

    #[test]
    fn test_percentile_rank() {
        struct TestCase {
            historical: Vec<f64>,
            value: f64,
            expected: f64,
        }

        let historical = vec![-5.0, -10.0, -15.0, -20.0];

        let cases = vec![
            // TC0: inclusive comparison counts the equal value
            TestCase {
                historical: historical.clone(),
                value: -10.0,
                expected: 75.0,
            },
            // TC1: value between samples
            TestCase {
                historical: historical.clone(),
                value: -12.0,
                expected: 50.0,
            },
            // TC2: below every sample
            TestCase {
                historical: historical.clone(),
                value: -25.0,
                expected: 0.0,
            },
            // TC3: above every sample
            TestCase {
                historical: historical.clone(),
                value: -1.0,
                expected: 100.0,
            },
            // TC4: empty history is the documented extreme percentile
            TestCase {
                historical: vec![],
                value: -10.0,
                expected: 100.0,
            },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            let actual = percentile::rank(&test.historical, test.value);
            assert_eq!(actual, test.expected, "TC{index} failed");
        }
    }

    #[test]
    fn test_quantile() {
        struct TestCase {
            historical: Vec<f64>,
            q: f64,
            expected: Result<f64, StatisticError>,
        }

        let cases = vec![
            // TC0: median interpolates between -10 and -15
            TestCase {
                historical: vec![-5.0, -10.0, -15.0, -20.0],
                q: 0.5,
                expected: Ok(-12.5),
            },
            // TC1: 10th percentile
            TestCase {
                historical: vec![-5.0, -10.0, -15.0, -20.0],
                q: 0.1,
                expected: Ok(-18.5),
            },
            // TC2: 1st percentile
            TestCase {
                historical: vec![-5.0, -10.0, -15.0, -20.0],
                q: 0.01,
                expected: Ok(-19.85),
            },
            // TC3: bounds are the extremes
            TestCase {
                historical: vec![-5.0, -10.0, -15.0, -20.0],
                q: 1.0,
                expected: Ok(-5.0),
            },
            // TC4: single sample
            TestCase {
                historical: vec![-7.5],
                q: 0.1,
                expected: Ok(-7.5),
            },
            // TC5: empty history
            TestCase {
                historical: vec![],
                q: 0.5,
                expected: Err(StatisticError::EmptyHistory),
            },
            // TC6: q outside [0, 1]
            TestCase {
                historical: vec![-5.0],
                q: 1.5,
                expected: Err(StatisticError::InvalidQuantile(1.5)),
            },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            let actual = percentile::quantile(&test.historical, test.q);
            match (actual, test.expected) {
                (Ok(actual), Ok(expected)) => {
                    assert!(f64_is_eq(actual, expected, 1e-9), "TC{index} failed: {actual}")
                }
                (actual, expected) => assert_eq!(actual, expected, "TC{index} failed"),
            }
        }
    }

    #[test]
    fn test_historical_distribution_excludes_zero() {
        let distribution = HistoricalDistribution::new([0.0, -13.6, -0.0, -4.5, 0.0, f64::NAN]);

        assert_eq!(distribution.values(), &[-13.6, -4.5]);
        assert_eq!(distribution.percentile_rank(-4.5), 100.0);
        assert_eq!(distribution.percentile_rank(-13.6), 50.0);
    }

    #[test]
    fn test_historical_distribution_only_zeros_is_empty() {
        let distribution = HistoricalDistribution::new([0.0, 0.0]);

        assert!(distribution.is_empty());
        assert_eq!(distribution.percentile_rank(0.0), 100.0);
        assert_eq!(distribution.quantile(0.1), Err(StatisticError::EmptyHistory));
    }
}
