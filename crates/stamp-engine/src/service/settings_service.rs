//! 计划参数服务
//!
//! 参数读多写少，读取经进程内缓存（ArcSwap）提供，更新后显式失效。
//! 印花发放等业务操作不走缓存，而是在各自事务内读取参数。

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::models::{ProgramSettings, SettingsPatch};
use crate::repository::SettingsSource;

/// 参数缓存
#[derive(Default)]
pub struct SettingsCache {
    current: ArcSwapOption<ProgramSettings>,
}

impl SettingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Arc<ProgramSettings>> {
        self.current.load_full()
    }

    pub fn set(&self, settings: ProgramSettings) -> Arc<ProgramSettings> {
        let settings = Arc::new(settings);
        self.current.store(Some(settings.clone()));
        settings
    }

    /// 使缓存失效，下次读取回源
    pub fn invalidate(&self) {
        self.current.store(None);
    }
}

/// 计划参数服务
pub struct SettingsService<P: SettingsSource> {
    source: Arc<P>,
    cache: SettingsCache,
}

impl<P: SettingsSource> SettingsService<P> {
    pub fn new(source: Arc<P>) -> Self {
        Self {
            source,
            cache: SettingsCache::new(),
        }
    }

    /// 读取参数（优先缓存）
    pub async fn get_settings(&self) -> Result<Arc<ProgramSettings>> {
        if let Some(settings) = self.cache.get() {
            debug!("命中参数缓存");
            return Ok(settings);
        }

        let settings = self.source.load().await?;
        Ok(self.cache.set(settings))
    }

    /// 部分更新参数
    ///
    /// 读取、校验和保存在数据源的同一事务内完成，并发更新不同字段不会互相覆盖。
    /// 成功后使缓存失效
    #[instrument(skip(self))]
    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<ProgramSettings> {
        let saved = self.source.update(&patch).await?;
        self.cache.invalidate();

        info!(
            min_amount_for_stamp = %saved.min_amount_for_stamp,
            duration_months = saved.membership_duration_months,
            reward_stamp_1 = %saved.reward_stamp_1_type,
            reward_stamp_10 = %saved.reward_stamp_10_type,
            "计划参数已更新"
        );
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoyaltyError;
    use crate::models::RewardType;
    use crate::repository::MockSettingsSource;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_get_settings_uses_cache() {
        let mut source = MockSettingsSource::new();
        source
            .expect_load()
            .times(1)
            .returning(|| Ok(ProgramSettings::default()));

        let service = SettingsService::new(Arc::new(source));
        let first = service.get_settings().await.unwrap();
        let second = service.get_settings().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_update_invalidates_cache() {
        let mut source = MockSettingsSource::new();
        let mut loads = 0;
        source.expect_load().times(2).returning(move || {
            loads += 1;
            let mut settings = ProgramSettings::default();
            if loads > 1 {
                settings.min_amount_for_stamp = Decimal::from(80_000);
            }
            Ok(settings)
        });
        source.expect_update().times(1).returning(|patch| {
            let mut settings = ProgramSettings::default();
            settings.apply(patch)?;
            Ok(settings)
        });

        let service = SettingsService::new(Arc::new(source));
        let before = service.get_settings().await.unwrap();
        assert_eq!(before.min_amount_for_stamp, Decimal::from(50_000));

        let saved = service
            .update_settings(SettingsPatch {
                min_amount_for_stamp: Some(Decimal::from(80_000)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(saved.min_amount_for_stamp, Decimal::from(80_000));

        let after = service.get_settings().await.unwrap();
        assert_eq!(after.min_amount_for_stamp, Decimal::from(80_000));
    }

    #[tokio::test]
    async fn test_rejected_update_keeps_cache() {
        let mut source = MockSettingsSource::new();
        source
            .expect_load()
            .times(1)
            .returning(|| Ok(ProgramSettings::default()));
        source.expect_update().times(1).returning(|_| {
            Err(LoyaltyError::Validation(
                "折扣百分比必须在 0 到 100 之间".into(),
            ))
        });

        let service = SettingsService::new(Arc::new(source));
        let cached = service.get_settings().await.unwrap();

        let err = service
            .update_settings(SettingsPatch {
                discount_percent: Some(150),
                reward_stamp_1_type: Some(RewardType::None),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LoyaltyError::Validation(_)));

        let still = service.get_settings().await.unwrap();
        assert!(Arc::ptr_eq(&cached, &still));
    }

    #[test]
    fn test_cache_invalidate() {
        let cache = SettingsCache::new();
        assert!(cache.get().is_none());
        cache.set(ProgramSettings::default());
        assert!(cache.get().is_some());
        cache.invalidate();
        assert!(cache.get().is_none());
    }
}
