//! Engine configuration.

use std::collections::HashMap;
use std::time::Duration;

use proxyepg_core::{GuideMeta, Provider, ReferenceZone, WeekStart, WindowPolicy};

use crate::error::{EngineError, EngineResult};

/// Settings for one guide run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Reference timezone for window boundaries and local-time records.
    pub zone: ReferenceZone,

    /// Day or week window.
    pub window_policy: WindowPolicy,

    /// First day of a week window.
    pub week_start: WeekStart,

    /// Logical channels resolved at the same time.
    pub max_parallel_channels: usize,

    /// Concurrent fetches allowed against a provider without an override.
    pub default_provider_concurrency: usize,

    /// Per-provider overrides of `default_provider_concurrency`.
    pub provider_concurrency: HashMap<Provider, usize>,

    /// Budget for the whole resolution phase.
    pub run_timeout: Duration,

    /// Header attributes of the output document.
    pub meta: GuideMeta,
}

impl EngineConfig {
    pub const DEFAULT_MAX_PARALLEL_CHANNELS: usize = 8;
    pub const DEFAULT_PROVIDER_CONCURRENCY: usize = 4;
    pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 900;

    /// Creates a configuration for the given reference timezone.
    pub fn new(zone: ReferenceZone) -> Self {
        Self {
            zone,
            ..Default::default()
        }
    }

    /// Builder: set the window policy.
    pub fn with_window_policy(mut self, policy: WindowPolicy) -> Self {
        self.window_policy = policy;
        self
    }

    /// Builder: set the week start.
    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    /// Builder: set max parallel channels.
    pub fn with_max_parallel_channels(mut self, max: usize) -> Self {
        self.max_parallel_channels = max;
        self
    }

    /// Builder: limit concurrent fetches against one provider.
    pub fn with_provider_concurrency(mut self, provider: Provider, limit: usize) -> Self {
        self.provider_concurrency.insert(provider, limit);
        self
    }

    /// Builder: set the run timeout.
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Builder: set the document header.
    pub fn with_meta(mut self, meta: GuideMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Concurrency limit that applies to `provider`.
    pub fn concurrency_for(&self, provider: Provider) -> usize {
        self.provider_concurrency
            .get(&provider)
            .copied()
            .unwrap_or(self.default_provider_concurrency)
    }

    /// Rejects settings that would stall or skip the run.
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_parallel_channels == 0 {
            return Err(EngineError::config("max_parallel_channels must be at least 1"));
        }
        if self.default_provider_concurrency == 0 {
            return Err(EngineError::config("provider concurrency must be at least 1"));
        }
        if let Some((provider, _)) = self.provider_concurrency.iter().find(|(_, n)| **n == 0) {
            return Err(EngineError::config(format!(
                "concurrency for {} must be at least 1",
                provider.key()
            )));
        }
        if self.run_timeout.is_zero() {
            return Err(EngineError::config("run timeout must be positive"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            zone: ReferenceZone::default(),
            window_policy: WindowPolicy::default(),
            week_start: WeekStart::default(),
            max_parallel_channels: Self::DEFAULT_MAX_PARALLEL_CHANNELS,
            default_provider_concurrency: Self::DEFAULT_PROVIDER_CONCURRENCY,
            provider_concurrency: HashMap::new(),
            run_timeout: Duration::from_secs(Self::DEFAULT_RUN_TIMEOUT_SECS),
            meta: GuideMeta::default(),
        }
    }
}
