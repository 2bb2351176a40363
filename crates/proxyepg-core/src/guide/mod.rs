//! Guide assembly.
//!
//! [`GuideBuilder`] collects resolved channels and their programmes and
//! produces a [`Guide`] whose channel list and programme list obey the output
//! ordering rules:
//!
//! - channels appear in the order they were added (catalog order);
//! - programmes are sorted by start, then by channel position, with a stable
//!   sort so the provider's own order breaks any remaining tie;
//! - a programme whose channel was never added is dropped, never emitted.
//!
//! Serialization lives in [`xmltv`].

pub mod xmltv;


use std::collections::HashMap;

use tracing::{debug, warn};

use crate::programme::Programme;

pub use xmltv::XmltvError;

/// Default value of the `generator-info-name` attribute.
pub const DEFAULT_GENERATOR_NAME: &str = "proxyEPG";
/// Default value of the `source-info-name` attribute.
pub const DEFAULT_SOURCE_NAME: &str = "FreeTV+Cellcom+Partner+Yes+HOT";
/// Default language tag for display names, titles and descriptions.
pub const DEFAULT_LANG: &str = "he";

/// Document-level attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideMeta {
    pub source_info_name: String,
    pub generator_info_name: String,
    pub lang: String,
}

impl Default for GuideMeta {
    fn default() -> Self {
        Self {
            source_info_name: DEFAULT_SOURCE_NAME.to_string(),
            generator_info_name: DEFAULT_GENERATOR_NAME.to_string(),
            lang: DEFAULT_LANG.to_string(),
        }
    }
}

/// A channel element of the output document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideChannel {
    pub id: String,
    pub display_name: String,
}

/// A finished guide, ready to serialize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guide {
    meta: GuideMeta,
    channels: Vec<GuideChannel>,
    programmes: Vec<Programme>,
}

impl Guide {
    pub fn meta(&self) -> &GuideMeta {
        &self.meta
    }

    pub fn channels(&self) -> &[GuideChannel] {
        &self.channels
    }

    pub fn programmes(&self) -> &[Programme] {
        &self.programmes
    }

    /// Returns the programmes of one channel, in document order.
    pub fn programmes_for<'a>(&'a self, channel_id: &'a str) -> impl Iterator<Item = &'a Programme> {
        self.programmes
            .iter()
            .filter(move |p| p.channel_id == channel_id)
    }
}

/// Accumulates channels and programmes for one [`Guide`].
#[derive(Debug, Default)]
pub struct GuideBuilder {
    meta: GuideMeta,
    channels: Vec<GuideChannel>,
    positions: HashMap<String, usize>,
    programmes: Vec<Programme>,
}

impl GuideBuilder {
    pub fn new(meta: GuideMeta) -> Self {
        Self {
            meta,
            ..Default::default()
        }
    }

    /// Adds a channel. Returns false if the id was already present, in which
    /// case the first entry is kept.
    pub fn add_channel(&mut self, id: impl Into<String>, display_name: impl Into<String>) -> bool {
        let id = id.into();
        if self.positions.contains_key(&id) {
            debug!(channel = %id, "channel already in guide");
            return false;
        }
        self.positions.insert(id.clone(), self.channels.len());
        self.channels.push(GuideChannel {
            id,
            display_name: display_name.into(),
        });
        true
    }

    /// Queues programmes. Channel membership is checked in [`build`](Self::build).
    pub fn add_programmes(&mut self, programmes: impl IntoIterator<Item = Programme>) {
        self.programmes.extend(programmes);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Drops orphaned programmes and sorts the rest.
    pub fn build(self) -> Guide {
        let Self {
            meta,
            channels,
            positions,
            programmes,
        } = self;

        let total = programmes.len();
        let mut kept: Vec<(usize, Programme)> = programmes
            .into_iter()
            .filter_map(|p| positions.get(&p.channel_id).map(|&pos| (pos, p)))
            .collect();
        let orphans = total - kept.len();
        if orphans > 0 {
            warn!(count = orphans, "dropping programmes for channels not in the guide");
        }

        kept.sort_by(|(pa, a), (pb, b)| a.start.cmp(&b.start).then(pa.cmp(pb)));

        Guide {
            meta,
            channels,
            programmes: kept.into_iter().map(|(_, p)| p).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 26, h, m, 0).unwrap()
    }

    fn prog(channel: &str, start: (u32, u32), end: (u32, u32), title: &str) -> Programme {
        Programme::new(channel, at(start.0, start.1), at(end.0, end.1), title).unwrap()
    }

    #[test]
    fn channels_keep_insertion_order() {
        let mut builder = GuideBuilder::default();
        assert!(builder.add_channel("b", "B"));
        assert!(builder.add_channel("a", "A"));
        let guide = builder.build();
        let ids: Vec<_> = guide.channels().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn duplicate_channel_keeps_first() {
        let mut builder = GuideBuilder::default();
        builder.add_channel("a", "First");
        assert!(!builder.add_channel("a", "Second"));
        let guide = builder.build();
        assert_eq!(guide.channels().len(), 1);
        assert_eq!(guide.channels()[0].display_name, "First");
    }

    #[test]
    fn orphans_are_never_emitted() {
        let mut builder = GuideBuilder::default();
        builder.add_channel("a", "A");
        builder.add_programmes([
            prog("a", (10, 0), (11, 0), "Kept"),
            prog("ghost", (9, 0), (10, 0), "Orphan"),
        ]);
        let guide = builder.build();
        assert_eq!(guide.programmes().len(), 1);
        assert_eq!(guide.programmes()[0].title, "Kept");
    }

    #[test]
    fn programmes_sorted_by_start_then_channel_position() {
        let mut builder = GuideBuilder::default();
        builder.add_channel("b", "B");
        builder.add_channel("a", "A");
        builder.add_programmes([
            prog("a", (12, 0), (13, 0), "a-noon"),
            prog("a", (10, 0), (11, 0), "a-ten"),
            prog("b", (12, 0), (13, 0), "b-noon"),
        ]);
        let guide = builder.build();
        let titles: Vec<_> = guide.programmes().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["a-ten", "b-noon", "a-noon"]);
    }

    #[test]
    fn equal_keys_keep_provider_order() {
        let mut builder = GuideBuilder::default();
        builder.add_channel("a", "A");
        builder.add_programmes([
            prog("a", (10, 0), (10, 30), "first"),
            prog("a", (10, 0), (11, 0), "second"),
        ]);
        let guide = builder.build();
        let titles: Vec<_> = guide.programmes_for("a").map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[test]
    fn empty_guide() {
        let guide = GuideBuilder::new(GuideMeta::default()).build();
        assert!(guide.channels().is_empty());
        assert!(guide.programmes().is_empty());
        assert_eq!(guide.meta().generator_info_name, "proxyEPG");
    }
}
