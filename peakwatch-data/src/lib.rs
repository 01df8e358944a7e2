// 允许 dev-dependencies 中的未使用 extern crate 警告
// 这些依赖仅在测试中使用，不在库代码中使用
#![allow(unused_extern_crates)]
#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments, type_alias_bounds)]

//! # Peakwatch-Data
//! 被跟踪指数的每日收盘价数据源。
//!
//! 为 Peakwatch 核心提供标准化的 `(日期, 收盘价)` 序列，无论数据来自哪里：
//! * **统一**: [`PriceSource`] Trait 为每个上游数据源提供相同的接口（全量历史、从某日起的增量）。
//! * **已验证**: 每个 [`PriceSeries`] 在离开本 crate 之前都经过 [`Validator`] 检查，
//!   保证日期严格递增、收盘价为有限值。
//! * **可替换**: 内置 Yahoo Finance 图表 API 客户端和本地 CSV 文件数据源，二者可通过配置切换。
//!
//! ## 核心抽象
//! - **PricePoint**: 单个交易日的收盘价。
//! - **PriceSeries**: 按日期升序排列的 [`PricePoint`] 集合。
//! - **PriceSource**: 上游数据源接口。没有新数据是合法的（空序列），不是错误。

use crate::error::DataError;
use chrono::NaiveDate;
use derive_more::Constructor;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Peakwatch-Data 中生成的所有 [`Error`](std::error::Error)。
pub mod error;

/// 基于本地 CSV 文件的 [`PriceSource`] 实现。
pub mod file;

/// 基于 Yahoo Finance v8 图表 API 的 [`PriceSource`] 实现。
pub mod yahoo;

/// 单个交易日的收盘价。
///
/// 市场在周末和节假日休市，因此相邻 [`PricePoint`] 之间存在日期间隔是正常的。
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Deserialize, Serialize, Constructor)]
pub struct PricePoint {
    /// 交易日。
    pub date: NaiveDate,
    /// 收盘价。
    pub close: f64,
}

/// 按日期严格升序排列的 [`PricePoint`] 序列。
///
/// 通过 [`Validator::validate`] 构造的序列保证：
/// - 日期严格递增（无重复、无乱序）
/// - 所有收盘价均为有限值
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct PriceSeries(pub Vec<PricePoint>);

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Self {
        Self(points)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.0
    }

    pub fn into_points(self) -> Vec<PricePoint> {
        self.0
    }

    /// 序列中最后一个交易日（如果存在）。
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.0.last().map(|point| point.date)
    }

    /// 仅保留日期严格晚于 `date` 的 [`PricePoint`]。
    ///
    /// 上游数据源在增量请求时经常重复返回最后一个已知交易日，
    /// 调用方使用此方法对已持久化的数据去重。
    pub fn after(self, date: NaiveDate) -> Self {
        Self(
            self.0
                .into_iter()
                .filter(|point| point.date > date)
                .collect(),
        )
    }

    /// 仅保留日期不早于 `date` 的 [`PricePoint`]。
    pub fn since(self, date: NaiveDate) -> Self {
        Self(
            self.0
                .into_iter()
                .filter(|point| point.date >= date)
                .collect(),
        )
    }
}

impl FromIterator<PricePoint> for PriceSeries {
    fn from_iter<T: IntoIterator<Item = PricePoint>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// [`Validator`] 能够确定其内部状态是否足以满足实现者定义的某些用例。
pub trait Validator {
    /// 检查 `Self` 是否有效。
    ///
    /// # 返回值
    ///
    /// 如果有效，返回 `Ok(Self)`；否则返回错误。
    fn validate(self) -> Result<Self, DataError>
    where
        Self: Sized;
}

impl Validator for PriceSeries {
    fn validate(self) -> Result<Self, DataError> {
        if let Some(point) = self.0.iter().find(|point| !point.close.is_finite()) {
            return Err(DataError::InvalidSeries(format!(
                "non-finite close {} on {}",
                point.close, point.date
            )));
        }

        if let Some((prev, next)) = self
            .0
            .iter()
            .tuple_windows()
            .find(|(prev, next)| next.date <= prev.date)
        {
            return Err(DataError::InvalidSeries(format!(
                "dates not strictly increasing: {} followed by {}",
                prev.date, next.date
            )));
        }

        Ok(self)
    }
}

/// 上游收盘价数据源。
///
/// 实现者必须返回按日期升序排列且已验证的 [`PriceSeries`]。
/// 请求区间内没有数据时返回空序列，而不是错误。
pub trait PriceSource {
    /// 从最早可用日期开始获取完整历史。
    fn fetch_history(&self) -> impl Future<Output = Result<PriceSeries, DataError>>;

    /// 获取从 `start`（包含）开始的历史。
    fn fetch_since(&self, start: NaiveDate) -> impl Future<Output = Result<PriceSeries, DataError>>;
}

/// 根据配置选择的 [`PriceSource`]。
#[derive(Debug, Clone)]
pub enum AnyPriceSource {
    /// Yahoo Finance 图表 API。
    Yahoo(yahoo::YahooChart),
    /// 本地 CSV 文件。
    File(file::CsvPriceSource),
}

impl PriceSource for AnyPriceSource {
    async fn fetch_history(&self) -> Result<PriceSeries, DataError> {
        match self {
            Self::Yahoo(source) => source.fetch_history().await,
            Self::File(source) => source.fetch_history().await,
        }
    }

    async fn fetch_since(&self, start: NaiveDate) -> Result<PriceSeries, DataError> {
        match self {
            Self::Yahoo(source) => source.fetch_since(start).await,
            Self::File(source) => source.fetch_since(start).await,
        }
    }
}
