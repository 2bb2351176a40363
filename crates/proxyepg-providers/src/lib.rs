//! ScheduleProvider trait and the per-provider adapters.
//!
//! This crate turns one provider's web API into raw schedule records:
//!
//! - [`ScheduleProvider`] - The trait every adapter implements
//! - [`RawRecord`] - Provider-shaped records, one variant per provider
//! - [`normalize_records`] - Converts raw records into [`Programme`]s
//! - [`ProviderError`] - Error type for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌────────┐ ┌─────────┐ ┌─────────┐ ┌─────┐ ┌─────┐
//! │ FreeTV │ │ Cellcom │ │ Partner │ │ Yes │ │ HOT │
//! └───┬────┘ └────┬────┘ └────┬────┘ └──┬──┘ └──┬──┘
//!     │           │ session   │         │       │ day cache
//!     │           │           │         │       │
//!     └───────────┴─────┬─────┴─────────┴───────┘
//!                       │  ScheduleProvider::fetch
//!                       ▼
//!                ┌─────────────┐
//!                │  RawRecord  │
//!                └──────┬──────┘
//!                       │
//!                       ▼ normalize_records()
//!                ┌─────────────┐
//!                │  Programme  │
//!                └─────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use proxyepg_providers::{ScheduleProvider, normalize_records};
//!
//! async fn programmes(provider: &dyn ScheduleProvider, window: &TimeWindow, zone: &ReferenceZone) {
//!     let raw = provider.fetch("13", window).await?;
//!     let batch = normalize_records(&raw, "channel13.il", zone);
//!     println!("{} programmes, {} dropped", batch.programmes.len(), batch.dropped);
//! }
//! ```
//!
//! [`Programme`]: proxyepg_core::Programme

pub mod cellcom;
pub mod error;
pub mod freetv;
pub mod hot;
pub mod http;
pub mod normalize;
pub mod partner;
pub mod provider;
pub mod raw;
pub mod single_flight;
pub mod yes;

pub use cellcom::{CellcomConfig, CellcomProvider, CellcomStrategy};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use freetv::{FreeTvConfig, FreeTvProvider};
pub use hot::{BulkDayCache, DayPartition, HotConfig, HotProvider};
pub use http::HttpSettings;
pub use normalize::{NormalizeError, NormalizedBatch, normalize_record, normalize_records};
pub use partner::{PartnerConfig, PartnerProvider};
pub use provider::{BoxFuture, ErrorProvider, ScheduleProvider};
pub use raw::{CellcomRecord, FreeTvRecord, HotRecord, PartnerRecord, RawRecord, YesRecord};
pub use single_flight::{KeyedSlots, SharedSlot};
pub use yes::{YesConfig, YesProvider};
