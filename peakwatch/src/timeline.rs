use crate::SectionId;
use chrono::NaiveDate;
use derive_more::Constructor;
use peakwatch_data::{PricePoint, PriceSeries};
use serde::{Deserialize, Serialize};

/// 持久化时间线中的一行：一个交易日的收盘价及其派生列。
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize, Constructor)]
pub struct TimelineRow {
    pub date: NaiveDate,
    pub close: f64,
    /// 回撤百分比，`<= 0`。
    pub drawdown: f64,
    /// 该点是否创出新高并开启了 `section`。
    pub new_peak: bool,
    pub section: SectionId,
}

impl From<&TimelineRow> for PricePoint {
    fn from(row: &TimelineRow) -> Self {
        PricePoint::new(row.date, row.close)
    }
}

/// 按日期严格升序排列、只追加的时间线。
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Timeline(Vec<TimelineRow>);

impl Timeline {
    pub fn new(rows: Vec<TimelineRow>) -> Self {
        Self(rows)
    }

    pub fn rows(&self) -> &[TimelineRow] {
        &self.0
    }

    pub fn into_rows(self) -> Vec<TimelineRow> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&TimelineRow> {
        self.0.last()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.last().map(|row| row.date)
    }

    /// 最后一行所在的区间。
    pub fn last_section(&self) -> Option<SectionId> {
        self.last().map(|row| row.section)
    }

    /// 从原始收盘价重新推导的运行峰值（所有收盘价的最大值，空时间线为 0）。
    ///
    /// 不信任任何缓存的峰值列；时间复杂度 O(n)。
    pub fn peak(&self) -> f64 {
        self.0.iter().map(|row| row.close).fold(0.0, f64::max)
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().map(|row| row.close)
    }

    /// 仅包含 `(日期, 收盘价)` 的原始序列。
    pub fn price_series(&self) -> PriceSeries {
        self.0.iter().map(PricePoint::from).collect()
    }

    /// 在末尾追加行。调用方保证日期严格晚于已有的最后一行。
    pub fn extend(&mut self, rows: impl IntoIterator<Item = TimelineRow>) {
        self.0.extend(rows);
    }
}
