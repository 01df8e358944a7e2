//! Store 持久化存储模块
//!
//! 时间线与区间最小回撤表作为两个平面表格文件持久化：
//! - 时间线按日期升序，每次更新整体重写
//! - 区间最小回撤表按区间升序，每次更新整体覆盖（最后一行可能被追溯修改）
//!
//! 写入必须是原子的：读者（例如仪表盘）可能读到稍旧的数据，但永远不会读到半写的文件。
//! 同一时间只允许一个写者，由 [`DrawdownStore::lock`] 返回的锁保证。

use crate::update::DrawdownState;
use parking_lot::Mutex;
use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use thiserror::Error;

/// 基于 CSV 文件的 [`DrawdownStore`] 实现。
pub mod file;

/// 持久化存储中产生的所有错误。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("atomic persist failed: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// 另一个写者持有更新锁。
    #[error("another update holds the lock: {}", .0.display())]
    Locked(PathBuf),
}

/// [`DrawdownState`] 的持久化存储。
pub trait DrawdownStore {
    /// 单写者锁，在 drop 时释放。
    type Lock;

    /// 加载已持久化的状态。
    ///
    /// 时间线不存在时返回 `Ok(None)`（尚未初始化）；存在但为空的时间线是合法状态。
    fn load(&self) -> Result<Option<DrawdownState>, StoreError>;

    /// 原子地整体替换已持久化的状态。
    fn save(&self, state: &DrawdownState) -> Result<(), StoreError>;

    /// 获取单写者锁。已被持有时返回 [`StoreError::Locked`]，不会阻塞等待。
    fn lock(&self) -> Result<Self::Lock, StoreError>;
}

/// 内存中的 [`DrawdownStore`]，用于测试以及不需要落盘的场景。
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<Option<DrawdownState>>>,
    locked: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new(state: Option<DrawdownState>) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            locked: Arc::default(),
        }
    }

    /// 当前保存的状态快照。
    pub fn snapshot(&self) -> Option<DrawdownState> {
        self.state.lock().clone()
    }
}

/// [`InMemoryStore`] 的单写者锁。
#[derive(Debug)]
pub struct InMemoryLock(Arc<AtomicBool>);

impl Drop for InMemoryLock {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl DrawdownStore for InMemoryStore {
    type Lock = InMemoryLock;

    fn load(&self) -> Result<Option<DrawdownState>, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, state: &DrawdownState) -> Result<(), StoreError> {
        *self.state.lock() = Some(state.clone());
        Ok(())
    }

    fn lock(&self) -> Result<Self::Lock, StoreError> {
        self.locked
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InMemoryLock(Arc::clone(&self.locked)))
            .map_err(|_| StoreError::Locked(PathBuf::from("<memory>")))
    }
}
