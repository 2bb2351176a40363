//! ScheduleProvider trait definition.
//!
//! This module defines [`ScheduleProvider`], the contract every upstream
//! adapter implements: given a provider-specific channel id and a time window,
//! return that channel's raw records.
//!
//! Adapters own their wire format, session state and per-day request
//! splitting. Callers only see [`RawRecord`]s or a [`ProviderError`].

use std::future::Future;
use std::pin::Pin;

use proxyepg_core::{Provider, TimeWindow};

use crate::error::{ProviderError, ProviderResult};
use crate::raw::RawRecord;

/// A boxed future for async trait methods.
///
/// Keeps the trait object-safe so adapters can sit behind `Arc<dyn _>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An upstream source of programme schedules.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync`; the engine calls `fetch`
///   concurrently for different channels on the same instance.
/// - Session tokens and bulk downloads are shared across those calls and
///   must be populated at most once (see [`crate::single_flight`]).
/// - A record that cannot be parsed is skipped, not reported as an error.
/// - No retries beyond the ones an adapter documents for itself.
pub trait ScheduleProvider: Send + Sync {
    /// Returns which provider this adapter talks to.
    fn provider(&self) -> Provider;

    /// Fetches the records for one channel over `window`.
    ///
    /// An empty vector means "no data" and is not an error.
    fn fetch<'a>(
        &'a self,
        channel_id: &'a str,
        window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawRecord>>>;
}

/// A provider that always fails with the same error.
///
/// Stands in for an adapter that could not be constructed, so the channels
/// that reference it fall through to their next variant.
#[derive(Debug)]
pub struct ErrorProvider {
    provider: Provider,
    error: ProviderError,
}

impl ErrorProvider {
    pub fn new(provider: Provider, error: ProviderError) -> Self {
        Self { provider, error }
    }
}

impl ScheduleProvider for ErrorProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn fetch<'a>(
        &'a self,
        _channel_id: &'a str,
        _window: &'a TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawRecord>>> {
        let error = self.error.replicate().with_provider(self.provider);
        Box::pin(async move { Err(error) })
    }
}
