//! Resolution engine and guide pipeline.
//!
//! This crate wires adapters, catalog and time window into one guide run:
//! - Ordered per-channel fallback across source variants
//! - Bounded concurrency, per channel and per provider
//! - Normalization and document assembly with a run report
//! - An overall run timeout that drops only the channels still pending
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use proxyepg_core::{Catalog, ReferenceZone};
//! use proxyepg_engine::{EngineConfig, GuideJob, ProviderRegistry};
//! use proxyepg_providers::{HttpSettings, YesConfig, YesProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let zone = ReferenceZone::default();
//!     let yes = YesProvider::new(YesConfig::default(), &HttpSettings::default(), zone)?;
//!     let registry = ProviderRegistry::new().with(Arc::new(yes));
//!     let catalog = Catalog::from_channels_xml(&std::fs::read_to_string("channels.xml")?)?;
//!
//!     let job = GuideJob::new(EngineConfig::new(zone), catalog, registry)?;
//!     let (guide, report) = job.run(chrono::Utc::now()).await;
//!     println!("{report}");
//!     std::fs::write("guide.xml", guide.to_xmltv()?)?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod limits;
mod pipeline;
mod resolver;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use limits::ProviderLimits;
pub use pipeline::{ChannelOutcome, ChannelReport, GuideJob, RunReport};
pub use resolver::{
    AttemptOutcome, ChannelResolution, ProviderRegistry, ResolutionEngine, VariantAttempt, Winner,
};
