//! Per-provider concurrency limits.

use std::collections::HashMap;
use std::sync::Arc;

use proxyepg_core::Provider;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::config::EngineConfig;

/// One semaphore per provider, bounding in-flight fetches against it.
#[derive(Debug, Clone)]
pub struct ProviderLimits {
    semaphores: HashMap<Provider, Arc<Semaphore>>,
}

impl ProviderLimits {
    /// Builds limits for every provider from `config`.
    pub fn from_config(config: &EngineConfig) -> Self {
        let semaphores = Provider::ALL
            .iter()
            .map(|p| (*p, Arc::new(Semaphore::new(config.concurrency_for(*p).max(1)))))
            .collect();
        Self { semaphores }
    }

    /// Waits for a fetch slot on `provider`.
    ///
    /// Returns `None` only if the semaphore was closed, which never happens
    /// for limits built here; callers then proceed unthrottled.
    pub async fn acquire(&self, provider: Provider) -> Option<SemaphorePermit<'_>> {
        self.semaphores.get(&provider)?.acquire().await.ok()
    }

    /// Free slots for `provider` right now.
    pub fn available(&self, provider: Provider) -> usize {
        self.semaphores
            .get(&provider)
            .map(|s| s.available_permits())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permits_follow_config() {
        let config = EngineConfig::default().with_provider_concurrency(Provider::FreeTv, 1);
        let limits = ProviderLimits::from_config(&config);

        assert_eq!(limits.available(Provider::FreeTv), 1);
        assert_eq!(limits.available(Provider::Hot), 4);

        let permit = limits.acquire(Provider::FreeTv).await;
        assert!(permit.is_some());
        assert_eq!(limits.available(Provider::FreeTv), 0);
        drop(permit);
        assert_eq!(limits.available(Provider::FreeTv), 1);
    }

    #[tokio::test]
    async fn clones_share_semaphores() {
        let limits = ProviderLimits::from_config(&EngineConfig::default());
        let other = limits.clone();
        let _permit = limits.acquire(Provider::Yes).await;
        assert_eq!(other.available(Provider::Yes), 3);
    }
}
