//! Resolution engine.
//!
//! Every logical channel is resolved independently: its variants are tried
//! in declared order and the first one whose adapter returns at least one
//! record wins. Errors and empty answers fall through to the next variant.
//! A channel with no winner is reported as unresolved; nothing here aborts
//! the run.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use proxyepg_core::{Catalog, LogicalChannel, Provider, SourceVariant, TimeWindow};
use proxyepg_providers::{ProviderError, RawRecord, ScheduleProvider};
use tokio::time::Instant;
use tracing::{Instrument, debug, debug_span, info, info_span, warn};

use crate::limits::ProviderLimits;

/// Adapters available for this run, at most one per provider.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<Provider, Arc<dyn ScheduleProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter` under the provider it reports, replacing any
    /// earlier one.
    pub fn register(&mut self, adapter: Arc<dyn ScheduleProvider>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, adapter: Arc<dyn ScheduleProvider>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, provider: Provider) -> Option<&Arc<dyn ScheduleProvider>> {
        self.adapters.get(&provider)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut providers: Vec<_> = self.adapters.keys().map(|p| p.key()).collect();
        providers.sort_unstable();
        f.debug_struct("ProviderRegistry")
            .field("providers", &providers)
            .finish()
    }
}

/// Why a variant did not win.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The adapter answered with no records.
    Empty,
    /// The adapter failed.
    Failed(ProviderError),
    /// No adapter is registered for the provider.
    NotConfigured,
    /// The run deadline passed while the adapter was still working.
    TimedOut,
}

/// One losing variant of a channel.
#[derive(Debug)]
pub struct VariantAttempt {
    pub provider: Provider,
    pub provider_channel_id: String,
    pub outcome: AttemptOutcome,
}

impl fmt::Display for VariantAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ", self.provider.key(), self.provider_channel_id)?;
        match &self.outcome {
            AttemptOutcome::Empty => write!(f, "returned no data"),
            AttemptOutcome::Failed(e) => write!(f, "failed ({e})"),
            AttemptOutcome::NotConfigured => write!(f, "has no adapter"),
            AttemptOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// The winning variant and its records.
#[derive(Debug)]
pub struct Winner {
    pub variant: SourceVariant,
    pub records: Vec<RawRecord>,
}

/// Outcome of resolving one logical channel.
#[derive(Debug)]
pub struct ChannelResolution<'c> {
    pub channel: &'c LogicalChannel,
    /// Variants tried before the winner, or all of them when there is none.
    pub attempts: Vec<VariantAttempt>,
    pub winner: Option<Winner>,
}

impl ChannelResolution<'_> {
    pub fn is_resolved(&self) -> bool {
        self.winner.is_some()
    }
}

/// Picks one winning variant per logical channel.
#[derive(Debug, Clone)]
pub struct ResolutionEngine {
    registry: ProviderRegistry,
    limits: ProviderLimits,
    max_parallel: usize,
}

impl ResolutionEngine {
    pub fn new(registry: ProviderRegistry, limits: ProviderLimits, max_parallel: usize) -> Self {
        Self {
            registry,
            limits,
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Resolves one channel, trying its variants in declared order.
    ///
    /// A variant still waiting on its provider at `deadline` is recorded as
    /// timed out and no later variant is tried.
    pub async fn resolve_channel<'c>(
        &self,
        channel: &'c LogicalChannel,
        window: &TimeWindow,
        deadline: Instant,
    ) -> ChannelResolution<'c> {
        let mut attempts = Vec::new();

        for variant in &channel.variants {
            let outcome = match self.registry.get(variant.provider) {
                None => AttemptOutcome::NotConfigured,
                Some(adapter) => {
                    let span = debug_span!(
                        "variant",
                        provider = variant.provider.key(),
                        site_id = %variant.provider_channel_id
                    );
                    let fetch = async {
                        let _permit = self.limits.acquire(variant.provider).await;
                        adapter
                            .fetch(&variant.provider_channel_id, window)
                            .instrument(span)
                            .await
                    };
                    match tokio::time::timeout_at(deadline, fetch).await {
                        Ok(Ok(records)) if !records.is_empty() => {
                            info!(
                                channel = %channel.id,
                                provider = %variant.provider.key(),
                                count = records.len(),
                                "channel resolved"
                            );
                            return ChannelResolution {
                                channel,
                                attempts,
                                winner: Some(Winner {
                                    variant: variant.clone(),
                                    records,
                                }),
                            };
                        }
                        Ok(Ok(_)) => AttemptOutcome::Empty,
                        Ok(Err(e)) => AttemptOutcome::Failed(e),
                        Err(_) => AttemptOutcome::TimedOut,
                    }
                }
            };

            let attempt = VariantAttempt {
                provider: variant.provider,
                provider_channel_id: variant.provider_channel_id.clone(),
                outcome,
            };
            let timed_out = matches!(attempt.outcome, AttemptOutcome::TimedOut);
            if timed_out {
                warn!(channel = %channel.id, attempt = %attempt, "run deadline reached");
            } else {
                debug!(channel = %channel.id, attempt = %attempt, "variant skipped");
            }
            attempts.push(attempt);
            if timed_out {
                break;
            }
        }

        ChannelResolution {
            channel,
            attempts,
            winner: None,
        }
    }

    /// Resolves every channel of `catalog`, returning results in catalog order.
    ///
    /// Channels run concurrently up to the engine's parallelism; the
    /// per-provider limits still apply inside each channel. Channels still
    /// pending at `deadline` come back unresolved; the others are kept.
    pub async fn resolve_all<'c>(
        &self,
        catalog: &'c Catalog,
        window: &TimeWindow,
        deadline: Instant,
    ) -> Vec<ChannelResolution<'c>> {
        let mut resolved: Vec<(usize, ChannelResolution<'c>)> =
            stream::iter(catalog.channels().iter().enumerate())
                .map(|(position, channel)| {
                    let span = info_span!("channel", id = %channel.id);
                    async move { (position, self.resolve_channel(channel, window, deadline).await) }
                        .instrument(span)
                })
                .buffer_unordered(self.max_parallel)
                .collect()
                .await;
        resolved.sort_by_key(|(position, _)| *position);
        resolved.into_iter().map(|(_, r)| r).collect()
    }
}
