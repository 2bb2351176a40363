//! End-to-end guide run: window, resolution, normalization, document.

use std::fmt;

use chrono::{DateTime, Utc};
use proxyepg_core::{Catalog, Guide, GuideBuilder, Provider, TimeWindow};
use proxyepg_providers::normalize_records;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::limits::ProviderLimits;
use crate::resolver::{
    AttemptOutcome, ChannelResolution, ProviderRegistry, ResolutionEngine, VariantAttempt,
};

/// What happened to one logical channel.
#[derive(Debug)]
pub enum ChannelOutcome {
    /// A variant won; `dropped` records could not be normalized.
    Resolved {
        provider: Provider,
        programmes: usize,
        dropped: usize,
    },
    /// No variant produced data; the channel is left out of the guide.
    Unresolved { attempts: Vec<VariantAttempt> },
}

/// Per-channel line of a [`RunReport`].
#[derive(Debug)]
pub struct ChannelReport {
    pub channel_id: String,
    pub outcome: ChannelOutcome,
}

/// Summary of one guide run, in catalog order.
#[derive(Debug)]
pub struct RunReport {
    pub window: TimeWindow,
    pub channels: Vec<ChannelReport>,
}

impl RunReport {
    fn new(window: TimeWindow) -> Self {
        Self {
            window,
            channels: Vec::new(),
        }
    }

    pub fn resolved(&self) -> usize {
        self.channels
            .iter()
            .filter(|c| matches!(c.outcome, ChannelOutcome::Resolved { .. }))
            .count()
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &ChannelReport> {
        self.channels
            .iter()
            .filter(|c| matches!(c.outcome, ChannelOutcome::Unresolved { .. }))
    }

    pub fn programmes(&self) -> usize {
        self.channels
            .iter()
            .map(|c| match c.outcome {
                ChannelOutcome::Resolved { programmes, .. } => programmes,
                ChannelOutcome::Unresolved { .. } => 0,
            })
            .sum()
    }

    pub fn dropped(&self) -> usize {
        self.channels
            .iter()
            .map(|c| match c.outcome {
                ChannelOutcome::Resolved { dropped, .. } => dropped,
                ChannelOutcome::Unresolved { .. } => 0,
            })
            .sum()
    }

    /// Unresolved channels whose last attempt ran into the run timeout.
    pub fn timed_out(&self) -> usize {
        self.channels
            .iter()
            .filter(|c| match &c.outcome {
                ChannelOutcome::Unresolved { attempts } => attempts
                    .last()
                    .is_some_and(|a| matches!(a.outcome, AttemptOutcome::TimedOut)),
                ChannelOutcome::Resolved { .. } => false,
            })
            .count()
    }

    /// Resolved channel count per winning provider, in provider order.
    pub fn wins_by_provider(&self) -> Vec<(Provider, usize)> {
        Provider::ALL
            .iter()
            .map(|p| {
                let wins = self
                    .channels
                    .iter()
                    .filter(|c| {
                        matches!(c.outcome, ChannelOutcome::Resolved { provider, .. } if provider == *p)
                    })
                    .count();
                (*p, wins)
            })
            .filter(|(_, wins)| *wins > 0)
            .collect()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} channels, {} programmes",
            self.resolved(),
            self.channels.len(),
            self.programmes()
        )?;
        for (provider, wins) in self.wins_by_provider() {
            write!(f, ", {}={wins}", provider.key())?;
        }
        match self.timed_out() {
            0 => Ok(()),
            n => write!(f, ", {n} timed out"),
        }
    }
}

/// One configured guide run over a catalog.
#[derive(Debug)]
pub struct GuideJob {
    config: EngineConfig,
    catalog: Catalog,
    engine: ResolutionEngine,
}

impl GuideJob {
    /// Creates a job, rejecting invalid engine settings.
    pub fn new(
        config: EngineConfig,
        catalog: Catalog,
        registry: ProviderRegistry,
    ) -> EngineResult<Self> {
        config.validate()?;
        let limits = ProviderLimits::from_config(&config);
        let engine = ResolutionEngine::new(registry, limits, config.max_parallel_channels);
        Ok(Self {
            config,
            catalog,
            engine,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Window this job covers when run at `now`.
    pub fn window_at(&self, now: DateTime<Utc>) -> TimeWindow {
        TimeWindow::for_policy(
            now,
            self.config.window_policy,
            &self.config.zone,
            self.config.week_start,
        )
    }

    /// Builds the guide as seen at `now`.
    ///
    /// Nothing here fails the run. Provider trouble and channels still
    /// pending when the run timeout expires show up as unresolved channels
    /// in the report; everything that finished in time is kept.
    pub async fn run(&self, now: DateTime<Utc>) -> (Guide, RunReport) {
        let window = self.window_at(now);
        info!(
            window = %window,
            zone = self.config.zone.name(),
            channels = self.catalog.len(),
            "starting guide run"
        );

        let deadline = Instant::now() + self.config.run_timeout;
        let resolutions = self
            .engine
            .resolve_all(&self.catalog, &window, deadline)
            .await;

        let (guide, report) = self.assemble(window, resolutions);
        if report.timed_out() > 0 {
            warn!(
                timed_out = report.timed_out(),
                after_secs = self.config.run_timeout.as_secs(),
                "run timeout reached, pending channels left out"
            );
        }
        info!(
            resolved = report.resolved(),
            unresolved = report.channels.len() - report.resolved(),
            programmes = report.programmes(),
            dropped = report.dropped(),
            "guide run finished: {report}"
        );
        (guide, report)
    }

    fn assemble(&self, window: TimeWindow, resolutions: Vec<ChannelResolution<'_>>) -> (Guide, RunReport) {
        let mut builder = GuideBuilder::new(self.config.meta.clone());
        let mut report = RunReport::new(window);

        for resolution in resolutions {
            let channel = resolution.channel;
            let outcome = match resolution.winner {
                Some(winner) => {
                    let batch = normalize_records(&winner.records, &channel.id, &self.config.zone);
                    builder.add_channel(&channel.id, channel.display_name_for(&winner.variant));
                    let outcome = ChannelOutcome::Resolved {
                        provider: winner.variant.provider,
                        programmes: batch.programmes.len(),
                        dropped: batch.dropped,
                    };
                    builder.add_programmes(batch.programmes);
                    outcome
                }
                None => {
                    let tried: Vec<String> =
                        resolution.attempts.iter().map(|a| a.to_string()).collect();
                    warn!(channel = %channel.id, attempts = ?tried, "channel unresolved, leaving it out");
                    ChannelOutcome::Unresolved {
                        attempts: resolution.attempts,
                    }
                }
            };
            report.channels.push(ChannelReport {
                channel_id: channel.id.clone(),
                outcome,
            });
        }

        (builder.build(), report)
    }
}
