use peakwatch::{
    SectionId, UpdateOutcome,
    statistic::{
        algorithm::{HistoricalDistribution, percentile},
        metric::drawdown::{DrawdownCalculator, min::SectionMinimums},
    },
    test_utils::{f64_is_eq, series_from},
    update::{DrawdownState, extend, from_scratch},
};
use peakwatch_data::PriceSeries;
use proptest::prelude::*;

fn split(series: &PriceSeries, k: usize) -> (PriceSeries, PriceSeries) {
    let (head, tail) = series.points().split_at(k);
    (PriceSeries::new(head.to_vec()), PriceSeries::new(tail.to_vec()))
}

fn extend_split(series: &PriceSeries, k: usize) -> DrawdownState {
    let (head, tail) = split(series, k);
    let prior = from_scratch(head).unwrap();
    extend(prior, tail).unwrap().into_state()
}

#[test]
fn test_five_point_scenario() {
    let actual = from_scratch(series_from(0, &[100.0, 110.0, 105.0, 95.0, 120.0])).unwrap();

    let rows = actual.timeline.rows();
    let sections = rows.iter().map(|row| row.section.value()).collect::<Vec<_>>();
    let new_peaks = rows.iter().map(|row| row.new_peak).collect::<Vec<_>>();
    assert_eq!(sections, vec![0, 1, 1, 1, 2]);
    assert_eq!(new_peaks, vec![true, true, false, false, true]);

    let expected_drawdowns = [0.0, 0.0, -4.545454545454546, -13.636363636363635, 0.0];
    for (index, (row, expected)) in rows.iter().zip(expected_drawdowns).enumerate() {
        assert!(f64_is_eq(row.drawdown, expected, 1e-9), "TC{index} failed");
    }

    assert_eq!(actual.minimums.len(), 3);
    assert_eq!(actual.minimums.get(&SectionId(0)), Some(0.0));
    assert!(f64_is_eq(
        actual.minimums.get(&SectionId(1)).unwrap(),
        -13.636363636363635,
        1e-9
    ));
    assert_eq!(actual.minimums.get(&SectionId(2)), Some(0.0));
}

#[test]
fn test_extend_reproduces_full_run() {
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
fn test_extend_discards_already_known_dates() {
    let prior = from_scratch(series_from(0, &[100.0, 110.0, 105.0])).unwrap();

    // Upstream resends the last known day alongside the new ones.
    let actual = extend(prior, series_from(2, &[105.0, 95.0, 120.0])).unwrap();

    let expected = from_scratch(series_from(0, &[100.0, 110.0, 105.0, 95.0, 120.0])).unwrap();
    assert_eq!(actual.into_state(), expected);
}

#[test]
fn test_historical_distribution_scenario() {
    let minimums = SectionMinimums::from_rows([
        (SectionId(0), 0.0),
        (SectionId(1), -5.0),
        (SectionId(2), -10.0),
        (SectionId(3), 0.0),
        (SectionId(4), -15.0),
        (SectionId(5), -20.0),
    ]);

    let historical = minimums.historical();

    assert_eq!(historical.values(), &[-20.0, -15.0, -10.0, -5.0]);
    assert_eq!(historical.percentile_rank(-10.0), 75.0);
    assert_eq!(historical.percentile_rank(-12.0), 50.0);

    let median = historical.quantile(0.5).unwrap();
    assert!(median < -10.0 && median > -15.0);
    assert!(f64_is_eq(median, -12.5, 1e-12));
}

#[test]
fn test_empty_historical_distribution() {
    let historical = HistoricalDistribution::new([0.0, 0.0]);

    assert!(historical.is_empty());
    assert_eq!(historical.percentile_rank(-3.0), percentile::RANK_EMPTY_HISTORY);
    assert!(historical.quantile(0.1).is_err());
}

fn closes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1.0f64..5_000.0, 0..48)
}

fn closes_with_split() -> impl Strategy<Value = (Vec<f64>, usize)> {
    closes().prop_flat_map(|closes| {
        let len = closes.len();
        (Just(closes), 0..=len)
    })
}

proptest! {
    /// Property: extending any prefix run with the remaining points equals the full run
    #[test]
    fn prop_split_equivalence((closes, k) in closes_with_split()) {
        let series = series_from(0, &closes);

        let expected = from_scratch(series.clone()).unwrap();

        prop_assert_eq!(extend_split(&series, k), expected);
    }

    /// Property: chaining several small batches equals the full run
    #[test]
    fn prop_batched_equivalence(closes in closes(), batch in 1usize..6) {
        let series = series_from(0, &closes);

        let actual = series
            .points()
            .chunks(batch)
            .try_fold(DrawdownState::default(), |state, chunk| {
                extend(state, PriceSeries::new(chunk.to_vec())).map(UpdateOutcome::into_state)
            })
            .unwrap();

        prop_assert_eq!(actual, from_scratch(series).unwrap());
    }

    /// Property: the running peak never decreases and never sits below the close
    #[test]
    fn prop_peak_monotonicity(closes in closes()) {
        let mut calculator = DrawdownCalculator::init(0.0);
        let mut previous = calculator.peak();

        for close in closes {
            calculator.update(close).unwrap();
            prop_assert!(calculator.peak() >= previous);
            prop_assert!(calculator.peak() >= close);
            previous = calculator.peak();
        }
    }

    /// Property: drawdowns are non-positive and zero exactly on the running peak
    #[test]
    fn prop_drawdown_sign(closes in closes()) {
        let state = from_scratch(series_from(0, &closes)).unwrap();
        let mut peak = 0.0f64;

        for row in state.timeline.rows() {
            peak = peak.max(row.close);
            prop_assert!(row.drawdown <= 0.0);
            prop_assert_eq!(row.drawdown == 0.0, row.close == peak);
        }
    }

    /// Property: sections never decrease and step by one exactly on a new high
    #[test]
    fn prop_section_monotonicity(closes in closes()) {
        let state = from_scratch(series_from(0, &closes)).unwrap();
        let rows = state.timeline.rows();

        if let Some(first) = rows.first() {
            prop_assert_eq!(first.section, SectionId(0));
            prop_assert!(first.new_peak);
        }

        let mut peak = rows.first().map_or(0.0, |row| row.close);
        for window in rows.windows(2) {
            let (previous, current) = (&window[0], &window[1]);
            let is_new_high = current.close > peak;

            prop_assert!(current.section >= previous.section);
            prop_assert_eq!(current.section.value() == previous.section.value() + 1, is_new_high);
            prop_assert_eq!(current.new_peak, is_new_high);

            peak = peak.max(current.close);
        }
    }

    /// Property: rank is bounded by [0, 100] and non-decreasing in the value
    #[test]
    fn prop_percentile_rank_bounds(
        historical in prop::collection::vec(-90.0f64..-0.01, 0..32),
        a in -100.0f64..0.0,
        b in -100.0f64..0.0,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };

        let rank_low = percentile::rank(&historical, low);
        let rank_high = percentile::rank(&historical, high);

        prop_assert!((0.0..=100.0).contains(&rank_low));
        prop_assert!((0.0..=100.0).contains(&rank_high));
        prop_assert!(rank_low <= rank_high);
    }

    /// Property: zero section minimums never reach the historical distribution
    #[test]
    fn prop_zero_exclusion(closes in closes()) {
        let state = from_scratch(series_from(0, &closes)).unwrap();

        let historical = state.minimums.historical();

        prop_assert!(historical.values().iter().all(|value| *value != 0.0));
        prop_assert_eq!(
            historical.len(),
            state.minimums.iter().filter(|(_, min)| *min != 0.0).count()
        );
    }
}
