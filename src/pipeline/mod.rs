use anyhow::{Context, Result};
use geo_types::{Geometry, LineString, Polygon};
use std::collections::HashMap;

use crate::classify::{GeometryVerdict, classify_way};
use crate::report::{Channel, KeyFrequencyTable, Summary};
use crate::rules::MatcherSet;
use crate::sinks::{WayFeature, WaySink};
use crate::storage::NodeStoreReader;
use crate::way::WayRecord;

pub type SinkBox = Box<dyn WaySink>;

/// The six output sinks, one per channel.
pub struct ChannelSinks {
    sinks: HashMap<Channel, SinkBox>,
}

impl ChannelSinks {
    /// Open one sink per channel with `open`.
    pub fn open<F>(mut open: F) -> Result<Self>
    where
        F: FnMut(Channel) -> Result<SinkBox>,
    {
        let mut sinks = HashMap::new();
        for channel in Channel::ALL {
            let sink = open(channel)
                .with_context(|| format!("Sink: Failed to open '{}' channel", channel.label()))?;
            sinks.insert(channel, sink);
        }
        Ok(Self { sinks })
    }

    fn write(&mut self, channel: Channel, feature: WayFeature) -> Result<()> {
        let sink = self
            .sinks
            .get_mut(&channel)
            .with_context(|| format!("Sink: No sink for '{}' channel", channel.label()))?;
        sink.write_way(feature)
            .with_context(|| format!("Sink: Failed writing to '{}' channel", channel.label()))
    }

    fn finish(&mut self) -> Result<()> {
        for channel in Channel::ALL {
            if let Some(sink) = self.sinks.get_mut(&channel) {
                sink.finish().with_context(|| {
                    format!("Sink: Failed to finalize '{}' channel", channel.label())
                })?;
            }
        }
        Ok(())
    }
}

/// Classifies ways and writes each to the channel of its verdict.
pub struct WayRouter<'a> {
    matchers: &'a MatcherSet,
    channels: ChannelSinks,
    node_store: Option<&'a NodeStoreReader>,
    summary: Summary,
    unknown_keys: KeyFrequencyTable,
}

impl<'a> WayRouter<'a> {
    pub fn new(matchers: &'a MatcherSet, channels: ChannelSinks) -> Self {
        Self {
            matchers,
            channels,
            node_store: None,
            summary: Summary::default(),
            unknown_keys: KeyFrequencyTable::new(),
        }
    }

    /// Resolve node coordinates so features carry a geometry.
    pub fn with_node_store(mut self, node_store: &'a NodeStoreReader) -> Self {
        self.node_store = Some(node_store);
        self
    }

    /// Route one way. Returns the channel it was written to, if any.
    ///
    /// Ways that are not closed are only counted.
    pub fn route(&mut self, way: &WayRecord) -> Result<Option<Channel>> {
        if !way.is_closed() {
            self.summary.non_closed += 1;
            return Ok(None);
        }
        self.summary.closed += 1;

        tracing::trace!("WAY {}", way.id);
        let classification = classify_way(self.matchers, way.tag_pairs());
        let Some(channel) = Channel::for_verdict(classification.verdict) else {
            return Ok(None);
        };

        if classification.verdict == GeometryVerdict::Both {
            self.unknown_keys
                .record_unknown_keys(&classification.unknown_keys);
        }
        self.summary.record(channel);

        let feature = self.build_feature(way, classification.verdict, channel);
        self.channels.write(channel, feature)?;
        Ok(Some(channel))
    }

    /// Finish every sink and hand back the run statistics.
    pub fn finish(mut self) -> Result<(Summary, KeyFrequencyTable)> {
        self.channels.finish()?;
        Ok((self.summary, self.unknown_keys))
    }

    fn build_feature(&self, way: &WayRecord, verdict: GeometryVerdict, channel: Channel) -> WayFeature {
        let mut properties = serde_json::Map::new();
        properties.insert("verdict".to_string(), verdict.as_str().into());
        properties.insert("tags".to_string(), way.tags_json().into());
        properties.insert("refs".to_string(), way.refs.clone().into());
        if let Some(meta) = &way.meta {
            meta.extend_properties(&mut properties);
        }

        WayFeature {
            id: way.id,
            geometry: self
                .node_store
                .and_then(|store| build_way_geometry(store, &way.refs, channel)),
            properties,
        }
    }
}

/// Geometry from node coordinates; `None` if any node is missing.
///
/// Ways in the polygon channel become polygons, everything else a linestring.
pub fn build_way_geometry(
    node_store: &NodeStoreReader,
    refs: &[i64],
    channel: Channel,
) -> Option<Geometry<f64>> {
    let coords: Vec<(f64, f64)> = refs
        .iter()
        .map(|&id| node_store.get(id))
        .collect::<Option<_>>()?;
    if coords.len() < 2 {
        return None;
    }

    let line_string = LineString::from(coords);
    if channel == Channel::Polygon && line_string.is_closed() && line_string.0.len() >= 4 {
        return Some(Geometry::Polygon(Polygon::new(line_string, vec![])));
    }
    Some(Geometry::LineString(line_string))
}
