//! Run statistics: per-channel counters, unknown-key frequencies and the
//! final summary.

mod keys;

pub use keys::{KeyCount, KeyFrequencyTable};

use crate::classify::GeometryVerdict;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Default for `min_key_count`: keys are listed only above this count.
pub const DEFAULT_MIN_KEY_COUNT: u64 = 10_000;

/// Output channel a closed way is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Unknown,
    Linestring,
    Polygon,
    Both,
    NoTags,
    Error,
}

impl Channel {
    /// Report order.
    pub const ALL: [Channel; 6] = [
        Channel::Unknown,
        Channel::Linestring,
        Channel::Polygon,
        Channel::Both,
        Channel::NoTags,
        Channel::Error,
    ];

    /// `None` means the way is dropped.
    pub fn for_verdict(verdict: GeometryVerdict) -> Option<Channel> {
        match verdict {
            GeometryVerdict::Unclassified => Some(Channel::NoTags),
            GeometryVerdict::Unknown => Some(Channel::Unknown),
            GeometryVerdict::Linestring => Some(Channel::Linestring),
            GeometryVerdict::Polygon => Some(Channel::Polygon),
            GeometryVerdict::Both => Some(Channel::Both),
            GeometryVerdict::Neutral => None,
            GeometryVerdict::Error => Some(Channel::Error),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Channel::Unknown => "unknown",
            Channel::Linestring => "linestring",
            Channel::Polygon => "polygon",
            Channel::Both => "both",
            Channel::NoTags => "no tags",
            Channel::Error => "error",
        }
    }

    /// Output file name without extension.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Channel::Unknown => "lp-unknown",
            Channel::Linestring => "lp-linestring",
            Channel::Polygon => "lp-polygon",
            Channel::Both => "lp-both",
            Channel::NoTags => "lp-no-tags",
            Channel::Error => "lp-error",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub non_closed: u64,
    pub closed: u64,
    pub unknown: u64,
    pub linestring: u64,
    pub polygon: u64,
    pub both: u64,
    pub no_tags: u64,
    pub error: u64,
}

impl Summary {
    pub fn record(&mut self, channel: Channel) {
        *self.slot(channel) += 1;
    }

    pub fn count(&self, channel: Channel) -> u64 {
        match channel {
            Channel::Unknown => self.unknown,
            Channel::Linestring => self.linestring,
            Channel::Polygon => self.polygon,
            Channel::Both => self.both,
            Channel::NoTags => self.no_tags,
            Channel::Error => self.error,
        }
    }

    /// Whole-number share of the closed ways, rounded down.
    pub fn percent(&self, channel: Channel) -> u64 {
        if self.closed == 0 {
            return 0;
        }
        self.count(channel) * 100 / self.closed
    }

    fn slot(&mut self, channel: Channel) -> &mut u64 {
        match channel {
            Channel::Unknown => &mut self.unknown,
            Channel::Linestring => &mut self.linestring,
            Channel::Polygon => &mut self.polygon,
            Channel::Both => &mut self.both,
            Channel::NoTags => &mut self.no_tags,
            Channel::Error => &mut self.error,
        }
    }
}

/// Write the human-readable report.
pub fn write_report<W: Write>(out: &mut W, summary: &Summary, keys: &[KeyCount]) -> Result<()> {
    writeln!(out, "Statistics:")?;
    writeln!(out, "  non-closed: {}", summary.non_closed)?;
    writeln!(out, "  closed:     {} (100%)", summary.closed)?;
    for channel in Channel::ALL {
        writeln!(
            out,
            "    {:<12}{} ({}%)",
            format!("{}:", channel.label()),
            summary.count(channel),
            summary.percent(channel)
        )?;
    }

    writeln!(out, "Keys:")?;
    for entry in keys {
        writeln!(out, "{} {}", entry.key, entry.count)?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    summary: &'a Summary,
    min_key_count: u64,
    keys: &'a [KeyCount],
}

/// Write the report as a JSON document.
pub fn write_json_report(
    path: &Path,
    summary: &Summary,
    min_key_count: u64,
    keys: &[KeyCount],
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Report: Failed to create JSON report {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(
        &mut writer,
        &JsonReport {
            summary,
            min_key_count,
            keys,
        },
    )
    .context("Report: Failed to serialize JSON report")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
