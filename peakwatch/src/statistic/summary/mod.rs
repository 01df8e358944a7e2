//! Summary 统计摘要模块
//!
//! 本模块从时间线与区间最小回撤表生成展示层与通知层共同消费的统计摘要。
//!
//! # 核心概念
//!
//! - **Statistic**: 单个统计值，或历史不足时的显式 "不可用" 标记
//! - **DrawdownSummary**: 仪表盘与电子邮件报告使用的统计摘要
//! - **ChartSeries**: 收盘价与回撤的绘图序列

use crate::{
    statistic::metric::drawdown::min::SectionMinimums,
    timeline::Timeline,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// 绘图序列。
pub mod chart;

/// 表格显示。
pub mod display;

/// 10% 分位数。
pub const QUANTILE_10: f64 = 0.10;

/// 1% 分位数。
pub const QUANTILE_1: f64 = 0.01;

/// 单个统计值。
///
/// 历史不足时（例如少于两个点无法计算日涨跌幅、历史分布为空无法计算分位数）
/// 使用 [`Statistic::NotAvailable`]，展示层必须能够正常渲染它。
///
/// 序列化为数字或 `null`。
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Default, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Statistic {
    Value(f64),
    #[default]
    NotAvailable,
}

impl Statistic {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(value) => Some(*value),
            Self::NotAvailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// 以百分比形式格式化（`-12.34%`），不可用时为 `N/A`。
    pub fn percent(&self) -> String {
        match self {
            Self::Value(value) => format!("{value:.2}%"),
            Self::NotAvailable => "N/A".to_string(),
        }
    }
}

impl From<Option<f64>> for Statistic {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::NotAvailable, Self::Value)
    }
}

impl Display for Statistic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => write!(f, "{value:.2}"),
            Self::NotAvailable => write!(f, "N/A"),
        }
    }
}

/// 回撤统计摘要。
///
/// ## 字段说明
///
/// - **daily_change_pct**: 最后两个收盘价之间的涨跌幅，少于两个点时不可用
/// - **current_drawdown_pct**: 最后一个点的回撤
/// - **last_section_min_drawdown**: 当前（最后一个）区间的最小回撤
/// - **last_section_percentile**: 当前区间最小回撤在历史分布中的百分位排名；
///   历史分布为空时为 100，没有任何区间时不可用
/// - **percentile_1** / **percentile_10**: 历史分布的 1% / 10% 分位数，分布为空时不可用
///
/// 历史分布由所有非 0 区间最小回撤构成（包括当前区间本身）。
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct DrawdownSummary {
    pub last_date: Option<NaiveDate>,
    pub last_close: Statistic,
    pub daily_change_pct: Statistic,
    pub current_drawdown_pct: Statistic,
    pub last_section: Option<u64>,
    pub last_section_min_drawdown: Statistic,
    pub last_section_percentile: Statistic,
    pub percentile_1: Statistic,
    pub percentile_10: Statistic,
}

impl DrawdownSummary {
    /// 从时间线与区间最小回撤表生成 [`DrawdownSummary`]。
    ///
    /// 从不失败：任何无法计算的字段都是 [`Statistic::NotAvailable`]。
    pub fn generate(timeline: &Timeline, minimums: &SectionMinimums) -> Self {
        let rows = timeline.rows();

        let daily_change_pct = match rows {
            [.., previous, latest] if previous.close != 0.0 => Statistic::Value(
                (latest.close - previous.close) / previous.close * 100.0,
            ),
            _ => Statistic::NotAvailable,
        };

        let last_section = timeline.last_section();
        let last_section_min = last_section.and_then(|section| minimums.get(&section));

        let historical = minimums.historical();

        Self {
            last_date: timeline.last_date(),
            last_close: timeline.last().map(|row| row.close).into(),
            daily_change_pct,
            current_drawdown_pct: timeline.last().map(|row| row.drawdown).into(),
            last_section: last_section.map(|section| section.value()),
            last_section_min_drawdown: last_section_min.into(),
            last_section_percentile: last_section_min
                .map(|min| historical.percentile_rank(min))
                .into(),
            percentile_1: historical.quantile(QUANTILE_1).ok().into(),
            percentile_10: historical.quantile(QUANTILE_10).ok().into(),
        }
    }
}
