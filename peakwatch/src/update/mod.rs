//! Update 增量更新模块
//!
//! 组合 [`DrawdownCalculator`]、[`SectionSegmenter`] 与 [`SectionMinimums`]，
//! 将已持久化的时间线扩展到新观测的收盘价。
//!
//! # 核心保证
//!
//! 对任意价格序列 `S` 与任意切分点 `k`：
//!
//! `extend(from_scratch(S[..k]), S[k..]) == from_scratch(S)`
//!
//! 全量计算本身就是在空时间线上的 [`extend`]，因此两条路径逐位一致。

use crate::{
    SectionId, UpdateOutcome,
    statistic::{
        error::StatisticError,
        metric::drawdown::{DrawdownCalculator, min::SectionMinimums, section::SectionSegmenter},
    },
    timeline::{Timeline, TimelineRow},
    update::error::UpdateError,
};
use itertools::izip;
use peakwatch_data::{PricePoint, PriceSeries, Validator};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 增量更新错误。
pub mod error;

/// 回撤统计的完整持久化状态：时间线与区间最小回撤表。
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct DrawdownState {
    pub timeline: Timeline,
    pub minimums: SectionMinimums,
}

impl DrawdownState {
    pub fn new(timeline: Timeline, minimums: SectionMinimums) -> Self {
        Self { timeline, minimums }
    }

    /// 参见 [`verify`]。
    pub fn verify(&self) -> Result<(), UpdateError> {
        verify(self)
    }

    /// 从时间线重新推导区间最小回撤表，替换不一致的已持久化表。
    ///
    /// 两个文件依次重命名，中途崩溃会留下新的时间线和旧的区间表；区间表总能从时间线推导，
    /// 因此以时间线为准。发生替换时返回 `true`。
    pub fn reconcile_minimums(&mut self) -> bool {
        let recomputed = minimums(&self.timeline);
        if recomputed == self.minimums {
            return false;
        }

        self.minimums = recomputed;
        true
    }
}

/// 将 `prior` 状态扩展到 `new_points`。
///
/// ## 工作流程
///
/// 1. 丢弃日期不晚于已持久化最后一个交易日的点，并验证剩余点的顺序
/// 2. 从已持久化的原始收盘价重新推导运行峰值，从最后一行读取区间
/// 3. 以此为种子同步运行回撤计算器与区间划分器
/// 4. 在整条扩展后的时间线上重新计算区间最小回撤
///
/// 去重后没有新点时返回 [`UpdateOutcome::NoNewData`]，`prior` 原样返回。
///
/// # 错误
///
/// 任何错误都在产生新状态之前返回，`prior` 不会被部分修改。
pub fn extend(
    prior: DrawdownState,
    new_points: PriceSeries,
) -> Result<UpdateOutcome<DrawdownState>, UpdateError> {
    let new_points = match prior.timeline.last_date() {
        Some(last_date) => new_points.after(last_date),
        None => new_points,
    }
    .validate()?;

    if new_points.is_empty() {
        debug!(last_date = ?prior.timeline.last_date(), "no new points after deduplication");
        return Ok(UpdateOutcome::NoNewData { state: prior });
    }

    let initial_peak = prior.timeline.peak();
    let initial_section = prior.timeline.last_section();
    let rows = derive_rows(new_points.points(), initial_peak, initial_section)?;
    let appended = rows.len();

    let DrawdownState { mut timeline, .. } = prior;
    timeline.extend(rows);
    let minimums = minimums(&timeline);

    debug!(
        appended,
        rows = timeline.len(),
        sections = minimums.len(),
        initial_peak,
        ?initial_section,
        "extended timeline"
    );

    Ok(UpdateOutcome::Updated {
        state: DrawdownState { timeline, minimums },
        appended,
    })
}

/// 从全量历史计算状态（在空时间线上的 [`extend`]）。
pub fn from_scratch(points: PriceSeries) -> Result<DrawdownState, UpdateError> {
    extend(DrawdownState::default(), points).map(UpdateOutcome::into_state)
}

/// 从原始收盘价全量重新计算，检查持久化的派生列与区间最小回撤表。
///
/// # 错误
///
/// 返回第一个不一致之处对应的 [`UpdateError::CorruptTimeline`]。
pub fn verify(state: &DrawdownState) -> Result<(), UpdateError> {
    let expected = from_scratch(state.timeline.price_series())?;

    if let Some((actual, expected)) = state
        .timeline
        .rows()
        .iter()
        .zip(expected.timeline.rows())
        .find(|(actual, expected)| actual != expected)
    {
        return Err(UpdateError::CorruptTimeline(format!(
            "row {} diverges: persisted {}, recomputed {}",
            actual.date,
            describe(actual),
            describe(expected)
        )));
    }

    if let Some((section, min)) = expected
        .minimums
        .iter()
        .find(|(section, min)| state.minimums.get(section) != Some(*min))
    {
        return Err(UpdateError::CorruptTimeline(format!(
            "section {section} minimum diverges: persisted {:?}, recomputed {min}",
            state.minimums.get(&section)
        )));
    }

    if state.minimums.len() != expected.minimums.len() {
        return Err(UpdateError::CorruptTimeline(format!(
            "{} section minimums persisted for {} sections",
            state.minimums.len(),
            expected.minimums.len()
        )));
    }

    Ok(())
}

/// 同步运行回撤计算器与区间划分器，两者共用相同的峰值种子。
fn derive_rows(
    points: &[PricePoint],
    initial_peak: f64,
    initial_section: Option<SectionId>,
) -> Result<Vec<TimelineRow>, StatisticError> {
    let closes = points.iter().map(|point| point.close).collect::<Vec<_>>();

    let (drawdowns, _) = DrawdownCalculator::compute(&closes, initial_peak)?;
    let (assignments, _) = SectionSegmenter::segment(&closes, initial_peak, initial_section);

    Ok(izip!(points, drawdowns, assignments)
        .map(|(point, drawdown, assignment)| {
            TimelineRow::new(
                point.date,
                point.close,
                drawdown,
                assignment.is_new_peak,
                assignment.section,
            )
        })
        .collect())
}

fn minimums(timeline: &Timeline) -> SectionMinimums {
    SectionMinimums::from_rows(timeline.rows().iter().map(|row| (row.section, row.drawdown)))
}

fn describe(row: &TimelineRow) -> String {
    format!(
        "(close {}, drawdown {}, new_peak {}, section {})",
        row.close, row.drawdown, row.new_peak, row.section
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{date_plus_days, f64_is_eq, series_from};

    fn sections(state: &DrawdownState) -> Vec<u64> {
        state.timeline.rows().iter().map(|row| row.section.value()).collect()
    }

    #[test]
    fn test_from_scratch_five_point_scenario() {
        let state = from_scratch(series_from(0, &[100.0, 110.0, 105.0, 95.0, 120.0])).unwrap();

        let expected_drawdowns = [0.0, 0.0, -4.545454545454546, -13.636363636363635, 0.0];
        for (index, (row, expected)) in state.timeline.rows().iter().zip(expected_drawdowns).enumerate() {
            assert!(f64_is_eq(row.drawdown, expected, 1e-9), "TC{index} failed");
        }
        assert_eq!(sections(&state), vec![0, 1, 1, 1, 2]);
        assert_eq!(
            state.timeline.rows().iter().map(|row| row.new_peak).collect::<Vec<_>>(),
            vec![true, true, false, false, true]
        );
        assert_eq!(state.minimums.get(&SectionId(0)), Some(0.0));
        assert!(f64_is_eq(
            state.minimums.get(&SectionId(1)).unwrap(),
            -13.636363636363635,
            1e-9
        ));
        assert_eq!(state.minimums.get(&SectionId(2)), Some(0.0));
    }

    #[test]
    fn test_extend_reproduces_from_scratch() {
        let prior = from_scratch(series_from(0, &[100.0, 110.0, 105.0])).unwrap();
        assert!(f64_is_eq(
            prior.minimums.get(&SectionId(1)).unwrap(),
            -4.545454545454546,
            1e-9
        ));

        let actual = extend(prior, series_from(3, &[95.0, 120.0])).unwrap();
        let expected = from_scratch(series_from(0, &[100.0, 110.0, 105.0, 95.0, 120.0])).unwrap();

        assert_eq!(
            actual,
            UpdateOutcome::Updated {
                state: expected,
                appended: 2
            }
        );
    }

    #[test]
    fn test_extend_outcomes() {
        struct TestCase {
            new_points: PriceSeries,
            expected_updated: bool,
            expected_len: usize,
        }

        let prior = || from_scratch(series_from(0, &[100.0, 110.0, 105.0])).unwrap();

        let cases = vec![
            // TC0: empty batch is no new data
            TestCase {
                new_points: PriceSeries::default(),
                expected_updated: false,
                expected_len: 3,
            },
            // TC1: only already known dates is no new data
            TestCase {
                new_points: series_from(1, &[110.0, 105.0]),
                expected_updated: false,
                expected_len: 3,
            },
            // TC2: overlapping batch keeps only dates after the last known one
            TestCase {
                new_points: series_from(2, &[105.0, 104.0, 111.0]),
                expected_updated: true,
                expected_len: 5,
            },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            let actual = extend(prior(), test.new_points).unwrap();
            assert_eq!(actual.is_updated(), test.expected_updated, "TC{index} failed");
            assert_eq!(actual.state().timeline.len(), test.expected_len, "TC{index} failed");
        }
    }

    #[test]
    fn test_extend_open_section_minimum_lowered() {
        let prior = from_scratch(series_from(0, &[100.0, 90.0])).unwrap();
        assert_eq!(prior.minimums.get(&SectionId(0)), Some(-10.0));

        let actual = extend(prior, series_from(2, &[80.0])).unwrap().into_state();

        assert_eq!(actual.minimums.get(&SectionId(0)), Some(-20.0));
        assert_eq!(actual.minimums.len(), 1);
    }

    #[test]
    fn test_extend_continuation_equal_to_peak() {
        let prior = from_scratch(series_from(0, &[100.0, 95.0])).unwrap();

        let actual = extend(prior, series_from(2, &[100.0])).unwrap().into_state();
        let last = actual.timeline.last().unwrap();

        assert_eq!(last.section, SectionId(0));
        assert!(!last.new_peak);
        assert_eq!(last.drawdown, 0.0);
    }

    #[test]
    fn test_extend_errors_leave_no_state() {
        struct TestCase {
            new_points: PriceSeries,
            expected: fn(&UpdateError) -> bool,
        }

        let cases = vec![
            // TC0: unordered new points
            TestCase {
                new_points: PriceSeries::new(vec![
                    PricePoint::new(date_plus_days(5), 101.0),
                    PricePoint::new(date_plus_days(4), 102.0),
                ]),
                expected: |error| matches!(error, UpdateError::InvalidSeries(_)),
            },
            // TC1: degenerate prices on an empty timeline
            TestCase {
                new_points: series_from(0, &[0.0, 0.0]),
                expected: |error| {
                    matches!(error, UpdateError::Statistic(StatisticError::Degenerate { .. }))
                },
            },
        ];

        for (index, test) in cases.into_iter().enumerate() {
            let actual = extend(DrawdownState::default(), test.new_points).unwrap_err();
            assert!((test.expected)(&actual), "TC{index} failed: {actual}");
        }
    }

    #[test]
    fn test_verify() {
        let valid = from_scratch(series_from(0, &[100.0, 110.0, 105.0, 95.0, 120.0])).unwrap();
        assert!(valid.verify().is_ok());

        let mut rows = valid.timeline.clone().into_rows();
        rows[2].section = SectionId(2);
        let corrupt_row = DrawdownState::new(Timeline::new(rows), valid.minimums.clone());
        assert!(matches!(corrupt_row.verify(), Err(UpdateError::CorruptTimeline(_))));

        let mut minimums = valid.minimums.clone();
        minimums.update(SectionId(1), -50.0);
        let corrupt_minimums = DrawdownState::new(valid.timeline.clone(), minimums);
        assert!(matches!(
            corrupt_minimums.verify(),
            Err(UpdateError::CorruptTimeline(_))
        ));

        let mut minimums = valid.minimums.clone();
        minimums.update(SectionId(9), -1.0);
        let extra_section = DrawdownState::new(valid.timeline, minimums);
        assert!(matches!(extra_section.verify(), Err(UpdateError::CorruptTimeline(_))));
    }

    #[test]
    fn test_reconcile_minimums() {
        struct TestCase {
            input: DrawdownState,
            expected_repaired: bool,
        }

        let full = from_scratch(series_from(0, &[100.0, 90.0, 80.0])).unwrap();
        let stale = from_scratch(series_from(0, &[100.0, 90.0])).unwrap();

        let cases = vec![
            // TC0: consistent pair is left untouched
            TestCase {
                input: full.clone(),
                expected_repaired: false,
            },
            // TC1: timeline written, section minimums from the previous cycle
            TestCase {
                input: DrawdownState::new(full.timeline.clone(), stale.minimums.clone()),
                expected_repaired: true,
            },
            // TC2: section minimum file missing
            TestCase {
                input: DrawdownState::new(full.timeline.clone(), SectionMinimums::default()),
                expected_repaired: true,
            },
        ];

        for (index, mut test) in cases.into_iter().enumerate() {
            let repaired = test.input.reconcile_minimums();

            assert_eq!(repaired, test.expected_repaired, "TC{index} failed");
            assert_eq!(test.input, full, "TC{index} failed");
            assert!(test.input.verify().is_ok(), "TC{index} failed");
        }
    }
}
