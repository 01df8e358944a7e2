use crate::{
    error::PeakwatchError,
    notify::AnyNotifier,
    store::file::CsvStore,
    system::{System, config::SystemConfig},
};
use peakwatch_data::AnyPriceSource;
use tracing::debug;

/// 由 [`SystemConfig`] 构建的 [`System`]。
pub type ConfiguredSystem = System<AnyPriceSource, CsvStore, AnyNotifier>;

/// 从 [`SystemConfig`] 构建 [`System`] 的构建器。
///
/// 所有路径和数据源句柄都从配置注入，不依赖全局常量或当前工作目录以外的隐式状态。
///
/// # 使用示例
///
/// ```rust,ignore
/// let config = SystemConfig::load("peakwatch.json")?;
/// let system = SystemBuilder::new(&config).build()?;
/// let report = system.update().await?;
/// ```
#[derive(Debug, Clone)]
pub struct SystemBuilder<'a> {
    config: &'a SystemConfig,
    notifications: bool,
}

impl<'a> SystemBuilder<'a> {
    pub fn new(config: &'a SystemConfig) -> Self {
        Self {
            config,
            notifications: true,
        }
    }

    /// 是否发送邮件报告。关闭时报告只写入日志。
    pub fn notifications(self, value: bool) -> Self {
        Self {
            notifications: value,
            ..self
        }
    }

    /// 构建 [`ConfiguredSystem`]。
    ///
    /// 启用通知时必须在 Tokio 运行时内调用，参见 [`AnyNotifier::from_config`]。
    pub fn build(self) -> Result<ConfiguredSystem, PeakwatchError> {
        let source = self.config.source.build()?;
        let store = CsvStore::new(
            &self.config.storage.timeline,
            &self.config.storage.section_minimums,
        );
        let notifier = AnyNotifier::from_config(
            self.config
                .notification
                .as_ref()
                .filter(|_| self.notifications),
        );

        debug!(
            timeline = %store.timeline_path().display(),
            minimums = %store.minimums_path().display(),
            email = matches!(notifier, AnyNotifier::Email(_)),
            "built system"
        );

        Ok(System::new(source, store, notifier))
    }
}
