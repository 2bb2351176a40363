//! Channel catalog: logical channels and their source variants.
//!
//! A [`LogicalChannel`] is one line item of the output guide. It owns an
//! ordered, non-empty list of [`SourceVariant`]s, each naming a [`Provider`]
//! and the opaque id that provider uses for the channel. The catalog is read
//! once at start of run and never changes afterwards.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The closed set of upstream schedule providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Provider {
    /// FreeTV web API, challenge protected.
    #[serde(rename = "freetv.tv")]
    FreeTv,
    /// Cellcom TV on the Kaltura OTT backend.
    #[serde(rename = "cellcom.co.il")]
    Cellcom,
    /// Partner TV per-day EPG endpoint.
    #[serde(rename = "partner.co.il")]
    Partner,
    /// Yes per-channel broadcast schedule.
    #[serde(rename = "yes.co.il")]
    Yes,
    /// HOT bulk schedule, all channels per day.
    #[serde(rename = "hot.net.il")]
    Hot,
}

impl Provider {
    /// Every provider, in a fixed order.
    pub const ALL: [Provider; 5] = [
        Provider::FreeTv,
        Provider::Cellcom,
        Provider::Partner,
        Provider::Yes,
        Provider::Hot,
    ];

    /// Returns the site identifier used in catalogs.
    pub fn site(&self) -> &'static str {
        match self {
            Self::FreeTv => "freetv.tv",
            Self::Cellcom => "cellcom.co.il",
            Self::Partner => "partner.co.il",
            Self::Yes => "yes.co.il",
            Self::Hot => "hot.net.il",
        }
    }

    /// Returns a short key used in configuration tables and logs.
    pub fn key(&self) -> &'static str {
        match self {
            Self::FreeTv => "freetv",
            Self::Cellcom => "cellcom",
            Self::Partner => "partner",
            Self::Yes => "yes",
            Self::Hot => "hot",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.site())
    }
}

impl FromStr for Provider {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.site() == lower || p.key() == lower)
            .ok_or(CatalogError::UnknownProvider(lower))
    }
}

impl TryFrom<String> for Provider {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Errors raised while building a catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// The site name is not one of the known providers.
    #[error("unknown provider site: {0}")]
    UnknownProvider(String),
    /// A logical channel has an empty id.
    #[error("channel #{0} has an empty id")]
    EmptyId(usize),
    /// A logical channel has no variants.
    #[error("channel {0} has no source variants")]
    NoVariants(String),
    /// The catalog document could not be parsed.
    #[error("failed to parse channel catalog: {0}")]
    Parse(String),
}

/// One candidate way to obtain data for a logical channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceVariant {
    /// The provider to ask.
    #[serde(rename = "site")]
    pub provider: Provider,
    /// The provider's own id for the channel. Opaque outside the adapter.
    #[serde(rename = "site_id")]
    pub provider_channel_id: String,
    /// Label used when the logical channel has no name of its own.
    #[serde(default, rename = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl SourceVariant {
    /// Creates a variant without a display name.
    pub fn new(provider: Provider, provider_channel_id: impl Into<String>) -> Self {
        Self {
            provider,
            provider_channel_id: provider_channel_id.into(),
            display_name: None,
        }
    }

    /// Builder method to set the fallback display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}

/// A channel of the output guide, independent of which provider feeds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalChannel {
    /// Stable external identifier, unique across the catalog.
    pub id: String,
    /// Display name; falls back to the winning variant's name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Candidates in priority order.
    pub variants: Vec<SourceVariant>,
}

impl LogicalChannel {
    /// Creates a channel with no variants yet.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            variants: Vec::new(),
        }
    }

    /// Builder method to set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder method to append a variant.
    pub fn with_variant(mut self, variant: SourceVariant) -> Self {
        self.variants.push(variant);
        self
    }

    /// Resolves the name to print for this channel once `variant` has won.
    ///
    /// Order: the channel's own name, the variant's name, the channel id.
    pub fn display_name_for<'a>(&'a self, variant: &'a SourceVariant) -> &'a str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| {
                variant
                    .display_name
                    .as_deref()
                    .filter(|n| !n.trim().is_empty())
            })
            .unwrap_or(&self.id)
    }
}

/// The immutable set of logical channels for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    channels: Vec<LogicalChannel>,
}

impl Catalog {
    /// Builds a validated catalog.
    ///
    /// Channels sharing an id are merged into the first occurrence, keeping
    /// variant order. Duplicate variants are kept; the resolver never reaches
    /// a later duplicate once an earlier one has won.
    pub fn new(channels: Vec<LogicalChannel>) -> Result<Self, CatalogError> {
        let mut merged: Vec<LogicalChannel> = Vec::with_capacity(channels.len());
        let mut index: HashMap<String, usize> = HashMap::new();

        for (pos, mut channel) in channels.into_iter().enumerate() {
            channel.id = channel.id.trim().to_string();
            if channel.id.is_empty() {
                return Err(CatalogError::EmptyId(pos));
            }
            if channel.variants.is_empty() {
                return Err(CatalogError::NoVariants(channel.id));
            }
            match index.get(&channel.id) {
                Some(&i) => {
                    debug!(channel = %channel.id, "merging repeated channel entry");
                    let existing = &mut merged[i];
                    if existing.name.is_none() {
                        existing.name = channel.name;
                    }
                    existing.variants.extend(channel.variants);
                }
                None => {
                    index.insert(channel.id.clone(), merged.len());
                    merged.push(channel);
                }
            }
        }

        Ok(Self { channels: merged })
    }

    /// Parses a WebGrab-style `channels.xml`.
    ///
    /// Every `<channel site=".." site_id=".." xmltv_id="..">Name</channel>`
    /// entry becomes a variant of the logical channel named by `xmltv_id`.
    /// Entries without `xmltv_id` or with an unknown site are skipped.
    pub fn from_channels_xml(xml: &str) -> Result<Self, CatalogError> {
        let doc: ChannelsXml =
            quick_xml::de::from_str(xml).map_err(|e| CatalogError::Parse(e.to_string()))?;

        let mut channels: Vec<LogicalChannel> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for entry in doc.channels {
            let Some(xmltv_id) = entry
                .xmltv_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
            else {
                debug!(site = %entry.site, site_id = %entry.site_id, "skipping entry without xmltv_id");
                continue;
            };

            let provider = match entry.site.parse::<Provider>() {
                Ok(p) => p,
                Err(e) => {
                    warn!(channel = %xmltv_id, error = %e, "skipping catalog entry");
                    continue;
                }
            };

            let name = entry
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(xmltv_id);
            let variant =
                SourceVariant::new(provider, entry.site_id.trim()).with_display_name(name);

            let slot = *index.entry(xmltv_id.to_string()).or_insert_with(|| {
                channels.push(LogicalChannel::new(xmltv_id));
                channels.len() - 1
            });
            channels[slot].variants.push(variant);
        }

        Self::new(channels)
    }

    /// Appends more channels, merging ids already present.
    pub fn extend(self, more: Vec<LogicalChannel>) -> Result<Self, CatalogError> {
        let mut all = self.channels;
        all.extend(more);
        Self::new(all)
    }

    /// Returns the channels in catalog order.
    pub fn channels(&self) -> &[LogicalChannel] {
        &self.channels
    }

    /// Returns the number of logical channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true if the catalog has no channels.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Looks up a channel by id.
    pub fn get(&self, id: &str) -> Option<&LogicalChannel> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// Returns how many variants reference each provider.
    pub fn provider_usage(&self) -> HashMap<Provider, usize> {
        let mut usage = HashMap::new();
        for variant in self.channels.iter().flat_map(|c| &c.variants) {
            *usage.entry(variant.provider).or_insert(0) += 1;
        }
        usage
    }
}

#[derive(Debug, Deserialize)]
struct ChannelsXml {
    #[serde(rename = "channel", default)]
    channels: Vec<ChannelEntry>,
}

#[derive(Debug, Deserialize)]
struct ChannelEntry {
    #[serde(rename = "@site", default)]
    site: String,
    #[serde(rename = "@site_id", default)]
    site_id: String,
    #[serde(rename = "@xmltv_id", default)]
    xmltv_id: Option<String>,
    #[serde(rename = "$text", default)]
    name: Option<String>,
}
