use crate::{
    statistic::summary::{DrawdownSummary, Statistic},
    timeline::Timeline,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 仪表盘绘图序列：收盘价走势图，以及带 10% / 1% 分位数参考线的回撤走势图。
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct ChartSeries {
    pub dates: Vec<NaiveDate>,
    pub close: Vec<f64>,
    pub drawdown: Vec<f64>,
    /// 回撤图的水平参考线，不可用时不绘制。
    pub percentile_10: Statistic,
    pub percentile_1: Statistic,
}

impl ChartSeries {
    pub fn generate(timeline: &Timeline, summary: &DrawdownSummary) -> Self {
        let rows = timeline.rows();

        Self {
            dates: rows.iter().map(|row| row.date).collect(),
            close: rows.iter().map(|row| row.close).collect(),
            drawdown: rows.iter().map(|row| row.drawdown).collect(),
            percentile_10: summary.percentile_10,
            percentile_1: summary.percentile_1,
        }
    }
}
