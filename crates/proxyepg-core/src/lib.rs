//! Core types: reference time, timestamps, catalog, programmes, guide output

pub mod catalog;
pub mod guide;
pub mod programme;
pub mod time;
pub mod timestamp;
pub mod tracing;

pub use catalog::{Catalog, CatalogError, LogicalChannel, Provider, SourceVariant};
pub use guide::{Guide, GuideBuilder, GuideChannel, GuideMeta, XmltvError};
pub use programme::{Programme, ProgrammeError};
pub use time::{ReferenceZone, TimeError, TimeWindow, WeekStart, WindowPolicy};
pub use timestamp::{TimestampEncoding, TimestampError, format_xmltv};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
