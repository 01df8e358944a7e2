//! Statistic 统计模块
//!
//! 本模块提供了分析收盘价时间线所需的统计算法和指标。
//!
//! # 核心概念
//!
//! - **algorithm**: 百分位排名与线性插值分位数
//! - **error**: 统计计算中的错误（退化输入、空历史分布）
//! - **metric**: 回撤、区间划分以及区间最小回撤
//! - **summary**: 提供给看板和邮件报告的统计数据包
//!
//! # 使用场景
//!
//! - 从零开始计算完整历史的回撤与区间
//! - 在已持久化状态的基础上增量扩展
//! - 评估当前区间的最小回撤在历史区间中的位置

/// 用于分析历史分布的统计算法。
pub mod algorithm;

/// 统计计算中可能发生的错误。
pub mod error;

/// 回撤及区间指标的计算逻辑。
pub mod metric;

/// 统计数据包与图表序列。
///
/// 例如，`DrawdownSummary`、`Statistic`、`ChartSeries`。
pub mod summary;
