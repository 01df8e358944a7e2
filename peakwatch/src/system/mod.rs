//! System 更新周期模块
//!
//! 本模块将数据源、持久化存储与通知者组合为完整的更新周期。
//!
//! # 核心概念
//!
//! - **System**: 注入了数据源、存储与通知者的更新周期驱动
//! - **SystemBuilder**: 从 [`SystemConfig`](config::SystemConfig) 构建 [`System`]
//! - **UpdateReport**: 一次周期的结果（新状态、统计摘要、投递结果）
//!
//! # 更新周期
//!
//! 1. 获取单写者锁（整个 加载-计算-持久化 过程中持有）
//! 2. 加载已持久化状态，不存在时返回 [`UpdateError::NotInitialized`]；
//!    区间最小回撤表与时间线不一致时以时间线为准重建
//! 3. 从最后一个已知交易日的次日开始获取收盘价
//! 4. 扩展状态；没有新数据时提前结束（只有重建过区间表时才写入）
//! 5. 持久化，生成统计摘要，发送报告（失败只记录，不中断）
//!
//! 计算错误在任何写入之前中断周期，已持久化的状态保持不变。

use crate::{
    UpdateOutcome,
    error::PeakwatchError,
    notify::{DeliveryReport, Notifier},
    statistic::summary::DrawdownSummary,
    store::DrawdownStore,
    update::{self, DrawdownState, error::UpdateError},
};
use derive_more::Constructor;
use peakwatch_data::PriceSource;
use tracing::{info, warn};

/// 从配置构建 [`System`]。
pub mod builder;

/// 系统配置。
pub mod config;

/// 一次更新周期的结果。
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    pub outcome: UpdateOutcome<DrawdownState>,
    pub summary: DrawdownSummary,
    /// 没有发送报告时为 `None`（初始化或没有新数据）。
    pub delivery: Option<DeliveryReport>,
}

/// 更新周期驱动。
///
/// ## 类型参数
///
/// - `Source`: 收盘价数据源，实现 [`PriceSource`]
/// - `Store`: 持久化存储，实现 [`DrawdownStore`]
/// - `Notify`: 报告通知者，实现 [`Notifier`]
#[derive(Debug, Clone, Constructor)]
pub struct System<Source, Store, Notify> {
    pub source: Source,
    pub store: Store,
    pub notifier: Notify,
}

impl<Source, Store, Notify> System<Source, Store, Notify>
where
    Source: PriceSource,
    Store: DrawdownStore,
    Notify: Notifier,
{
    /// 获取完整历史，从头计算并持久化。已有的持久化状态会被整体替换。
    pub async fn initialise(&self) -> Result<UpdateReport, PeakwatchError> {
        let _lock = self.store.lock()?;

        let history = self.source.fetch_history().await?;
        if history.is_empty() {
            warn!("price source returned no history, persisting an empty timeline");
        }

        let state = update::from_scratch(history)?;
        self.store.save(&state)?;

        let summary = DrawdownSummary::generate(&state.timeline, &state.minimums);
        info!(
            rows = state.timeline.len(),
            sections = state.minimums.len(),
            last_date = ?state.timeline.last_date(),
            "initialised timeline from full history"
        );

        let appended = state.timeline.len();
        Ok(UpdateReport {
            outcome: UpdateOutcome::Updated { state, appended },
            summary,
            delivery: None,
        })
    }

    /// 执行一次增量更新周期。
    ///
    /// # 错误
    ///
    /// 尚未初始化时返回 [`UpdateError::NotInitialized`]，调用方可以改为调用 [`Self::initialise`]。
    pub async fn update(&self) -> Result<UpdateReport, PeakwatchError> {
        let _lock = self.store.lock()?;

        let mut prior = self.store.load()?.ok_or(UpdateError::NotInitialized)?;
        let repaired = prior.reconcile_minimums();
        if repaired {
            warn!(
                sections = prior.minimums.len(),
                "persisted section minimums disagree with the timeline, rebuilt from the timeline"
            );
        }

        let new_points = match prior.timeline.last_date().and_then(|date| date.succ_opt()) {
            Some(start) => self.source.fetch_since(start).await?,
            None => self.source.fetch_history().await?,
        };

        let outcome = update::extend(prior, new_points)?;
        let state = outcome.state();
        let summary = DrawdownSummary::generate(&state.timeline, &state.minimums);

        let delivery = match &outcome {
            UpdateOutcome::NoNewData { state } => {
                if repaired {
                    self.store.save(state)?;
                }
                info!(last_date = ?state.timeline.last_date(), "no new data available");
                None
            }
            UpdateOutcome::Updated { state, appended } => {
                self.store.save(state)?;
                info!(
                    appended,
                    rows = state.timeline.len(),
                    last_date = ?state.timeline.last_date(),
                    percentile = %summary.last_section_percentile.percent(),
                    "timeline updated"
                );
                Some(self.notifier.notify(&summary).await)
            }
        };

        Ok(UpdateReport {
            outcome,
            summary,
            delivery,
        })
    }

    /// 增量更新；尚未初始化时回退到全量初始化。
    pub async fn update_or_initialise(&self) -> Result<UpdateReport, PeakwatchError> {
        match self.update().await {
            Err(error) if error.is_not_initialized() => {
                info!("no persisted timeline, falling back to full initialisation");
                self.initialise().await
            }
            result => result,
        }
    }
}

impl<Source, Store, Notify> System<Source, Store, Notify>
where
    Store: DrawdownStore,
{
    /// 加载已持久化状态（不获取写锁，可能读到稍旧的数据）。
    pub fn load(&self) -> Result<DrawdownState, PeakwatchError> {
        Ok(self.store.load()?.ok_or(UpdateError::NotInitialized)?)
    }

    /// 当前已持久化状态的统计摘要。区间最小回撤始终与时间线一致（参见
    /// [`DrawdownState::reconcile_minimums`]）。
    pub fn summary(&self) -> Result<DrawdownSummary, PeakwatchError> {
        let mut state = self.load()?;
        state.reconcile_minimums();
        Ok(DrawdownSummary::generate(&state.timeline, &state.minimums))
    }

    /// 从原始收盘价重新计算并检查已持久化状态。
    pub fn verify(&self) -> Result<DrawdownState, PeakwatchError> {
        let state = self.load()?;
        state.verify()?;

        info!(
            rows = state.timeline.len(),
            sections = state.minimums.len(),
            "persisted state matches full recomputation"
        );
        Ok(state)
    }
}
