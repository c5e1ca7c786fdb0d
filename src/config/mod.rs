use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::report::DEFAULT_MIN_KEY_COUNT;
use crate::rules::RuleKind;

/// Effective settings after layering defaults, the optional config file and
/// command line overrides.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    pub expressions_dir: PathBuf,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub min_key_count: u64,
    pub with_geometry: bool,
    pub node_cache_mode: NodeCacheMode,
    pub rules: RuleFiles,
}

/// Rule file names, relative to `expressions_dir` unless absolute.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuleFiles {
    pub polygon: String,
    pub linestring: String,
    pub meta: String,
    pub neutral: String,
    pub import: String,
}

impl RuleFiles {
    pub fn file_name(&self, kind: RuleKind) -> &str {
        match kind {
            RuleKind::Polygon => &self.polygon,
            RuleKind::Linestring => &self.linestring,
            RuleKind::Meta => &self.meta,
            RuleKind::Neutral => &self.neutral,
            RuleKind::Import => &self.import,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[value(name = "geojsonl", alias = "jsonl")]
    GeoJsonl,
    #[value(name = "geojson")]
    GeoJson,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::GeoJsonl => "geojsonl",
            OutputFormat::GeoJson => "geojson",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NodeCacheMode {
    /// Hash map in memory; any input order
    Memory,
    /// Memory-mapped sorted temp file; input must be sorted by id
    Sparse,
}

impl NodeCacheMode {
    pub fn label(&self) -> &'static str {
        match self {
            NodeCacheMode::Memory => "memory",
            NodeCacheMode::Sparse => "sparse",
        }
    }
}

/// Values given on the command line; `None` leaves lower layers in effect.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub expressions_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub min_key_count: Option<u64>,
    pub with_geometry: bool,
    pub node_cache_mode: Option<NodeCacheMode>,
}

fn path_value(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().into_owned())
}

impl Settings {
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut builder = ::config::Config::builder()
            .set_default("expressions_dir", ".")?
            .set_default("output_dir", ".")?
            .set_default("format", OutputFormat::GeoJsonl.extension())?
            .set_default("min_key_count", DEFAULT_MIN_KEY_COUNT)?
            .set_default("with_geometry", false)?
            .set_default("node_cache_mode", NodeCacheMode::Memory.label())?;
        for kind in RuleKind::ALL {
            builder = builder.set_default(format!("rules.{}", kind.label()), kind.default_file_name())?;
        }

        if let Some(path) = file {
            if !path.exists() {
                anyhow::bail!("Config: File {:?} does not exist", path);
            }
            builder = builder.add_source(::config::File::from(path));
        }

        let settings = builder
            .set_override_option("expressions_dir", path_value(&overrides.expressions_dir))?
            .set_override_option("output_dir", path_value(&overrides.output_dir))?
            .set_override_option("format", overrides.format.map(|f| f.extension()))?
            .set_override_option("min_key_count", overrides.min_key_count)?
            .set_override_option("with_geometry", overrides.with_geometry.then_some(true))?
            .set_override_option("node_cache_mode", overrides.node_cache_mode.map(|m| m.label()))?
            .build()
            .context("Config: Failed to assemble settings")?;

        settings
            .try_deserialize()
            .context("Config: Invalid settings")
    }

    /// Path of one rule file.
    pub fn rule_path(&self, kind: RuleKind) -> PathBuf {
        self.expressions_dir.join(self.rules.file_name(kind))
    }

    /// Path of one output channel file.
    pub fn channel_path(&self, file_stem: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", file_stem, self.format.extension()))
    }
}
