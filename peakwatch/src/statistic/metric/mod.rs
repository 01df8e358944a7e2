//! Metric 指标模块
//!
//! 本模块提供了时间线上的逐点指标计算逻辑。
//!
//! # 核心指标
//!
//! - **Drawdown**: 回撤百分比、区间划分以及区间最小回撤

/// Drawdown 回撤计算逻辑。
pub mod drawdown;
