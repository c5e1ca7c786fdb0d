use anyhow::{Context, Result, anyhow};
use clap::Parser;
use crossbeam_channel::{Sender, bounded};
use osmpbf::{Blob, BlobDecode, BlobReader, Element, HeaderBlock, PrimitiveBlock};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{NodeCacheMode, OutputFormat, Overrides, Settings};
use crate::pipeline::{ChannelSinks, SinkBox, WayRouter};
use crate::sinks::{GeoJsonSink, GeoJsonlSink};
use crate::storage::{NodeStoreReader, NodeStoreWriter};
use crate::utils::ProgressCounter;
use crate::way::WayRecord;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input PBF file
    pub input: PathBuf,

    /// Directory for the lp-* output files
    #[arg(short, long, env = "LPCLASS_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory holding the rule files
    #[arg(short, long, env = "LPCLASS_EXPRESSIONS_DIR")]
    pub expressions_dir: Option<PathBuf>,

    /// Settings file (YAML)
    #[arg(short, long, env = "LPCLASS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// List unknown keys of `both` ways seen more often than this
    #[arg(long)]
    pub min_key_count: Option<u64>,

    /// Resolve node locations and write way geometries
    #[arg(long)]
    pub with_geometry: bool,

    /// Node cache used with --with-geometry
    #[arg(long, value_enum)]
    pub node_cache_mode: Option<NodeCacheMode>,

    /// Also write the report as JSON
    #[arg(long)]
    pub report_json: Option<PathBuf>,

    /// Number of threads (default: all cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Trace every tag decision
    #[arg(short, long)]
    pub debug: bool,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            expressions_dir: self.expressions_dir.clone(),
            output_dir: self.output_dir.clone(),
            format: self.format,
            min_key_count: self.min_key_count,
            with_geometry: self.with_geometry,
            node_cache_mode: self.node_cache_mode,
        }
    }
}

/// Create the output directory and one sink per channel.
pub fn open_channels(settings: &Settings) -> Result<ChannelSinks> {
    std::fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!(
            "Sink: Failed to create output directory {:?}",
            settings.output_dir
        )
    })?;

    ChannelSinks::open(|channel| {
        let path = settings.channel_path(channel.file_stem());
        tracing::info!("Sink: {} -> {:?}", channel.label(), path);
        let sink: SinkBox = match settings.format {
            OutputFormat::GeoJsonl => Box::new(
                GeoJsonlSink::new(&path)
                    .with_context(|| format!("Sink: Failed to create {:?}", path))?,
            ),
            OutputFormat::GeoJson => Box::new(
                GeoJsonSink::new(&path)
                    .with_context(|| format!("Sink: Failed to create {:?}", path))?,
            ),
        };
        Ok(sink)
    })
}

pub fn log_sorted_header(header: &HeaderBlock, logged: &AtomicBool) {
    let found: Vec<&str> = header
        .required_features()
        .iter()
        .chain(header.optional_features())
        .map(|feature| feature.trim())
        .filter(|feature| {
            ["Sort.Nodes", "Sort.Ways", "Sort.Relations", "Sort.Type_then_ID"]
                .iter()
                .any(|known| known.eq_ignore_ascii_case(feature))
        })
        .collect();

    if !found.is_empty() && !logged.swap(true, Ordering::SeqCst) {
        tracing::info!("Detected PBF sort header(s): {}", found.join(", "));
    }
}

fn collect_node_batch(block: &PrimitiveBlock) -> Vec<(i64, f64, f64)> {
    block
        .elements()
        .filter_map(|element| match element {
            Element::Node(node) => Some((node.id(), node.lat(), node.lon())),
            Element::DenseNode(node) => Some((node.id(), node.lat(), node.lon())),
            _ => None,
        })
        .collect()
}

fn index_blob(
    blob: Blob,
    header_logged: &AtomicBool,
    tx: &Sender<Vec<(i64, f64, f64)>>,
) -> Result<()> {
    match blob
        .decode()
        .context("Input: Failed to decode blob while indexing nodes")?
    {
        BlobDecode::OsmHeader(header) => log_sorted_header(&header, header_logged),
        BlobDecode::OsmData(block) => {
            let batch = collect_node_batch(&block);
            if !batch.is_empty() {
                tx.send(batch)
                    .map_err(|err| anyhow!("NodeStore: Failed to send node batch: {}", err))?;
            }
        }
        BlobDecode::Unknown(unknown) => tracing::info!("Unknown blob: {}", unknown),
    }
    Ok(())
}

/// Load every node location into a store.
///
/// Memory mode decodes blobs in parallel. Sparse mode stays sequential so
/// node ids arrive in file order.
pub fn index_nodes(path: &Path, mode: NodeCacheMode) -> Result<NodeStoreReader> {
    let mut reader = BlobReader::from_path(path)
        .with_context(|| format!("Input: Failed to open {:?}", path))?;
    let node_store = NodeStoreWriter::new(mode)?;
    let (tx, rx) = bounded::<Vec<(i64, f64, f64)>>(64);
    let header_logged = AtomicBool::new(false);

    let writer = std::thread::spawn(move || -> Result<(NodeStoreWriter, u64)> {
        let mut node_store = node_store;
        let mut node_count = 0u64;
        let progress = ProgressCounter::new("Indexing nodes", 100_000);

        for batch in rx {
            let batch_len = batch.len() as u64;
            for (id, lat, lon) in batch {
                node_store
                    .put(id, lat, lon)
                    .with_context(|| format!("NodeStore: Failed writing node {}", id))?;
            }
            node_count += batch_len;
            progress.inc(batch_len);
        }

        progress.finish();
        Ok((node_store, node_count))
    });

    tracing::info!("Indexing nodes from {:?} into {} cache", path, mode.label());
    let decode_result = match mode {
        NodeCacheMode::Memory => reader.par_bridge().try_for_each(|blob| -> Result<()> {
            index_blob(blob?, &header_logged, &tx)
        }),
        NodeCacheMode::Sparse => reader.try_for_each(|blob| -> Result<()> {
            index_blob(blob?, &header_logged, &tx)
        }),
    };
    drop(tx);

    // The writer holds the root cause when the channel was disconnected early.
    let (node_store, node_count) = match writer.join() {
        Ok(Ok(result)) => result,
        Ok(Err(writer_err)) => return Err(writer_err),
        Err(_) => return Err(anyhow!("NodeStore: Node writer thread panicked")),
    };
    decode_result?;

    tracing::info!("Indexed {} nodes.", node_count);
    node_store.finalize()
}

/// Route every way in file order. Returns the number of ways read.
pub fn classify_ways(path: &Path, router: &mut WayRouter<'_>) -> Result<u64> {
    let reader = BlobReader::from_path(path)
        .with_context(|| format!("Input: Failed to open {:?}", path))?;
    let header_logged = AtomicBool::new(false);
    let progress = ProgressCounter::new("Classifying ways", 100_000);

    for blob in reader {
        let blob = blob.with_context(|| format!("Input: Failed to read {:?}", path))?;
        let block = match blob
            .decode()
            .with_context(|| format!("Input: Failed to decode {:?}", path))?
        {
            BlobDecode::OsmHeader(header) => {
                log_sorted_header(&header, &header_logged);
                continue;
            }
            BlobDecode::OsmData(block) => block,
            BlobDecode::Unknown(unknown) => {
                tracing::info!("Unknown blob: {}", unknown);
                continue;
            }
        };

        for element in block.elements() {
            if let Element::Way(way) = element {
                router.route(&WayRecord::from_osm(&way))?;
                progress.inc(1);
            }
        }
    }

    progress.finish();
    Ok(progress.count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_become_overrides() {
        let cli = Cli::parse_from([
            "lpclass",
            "planet.osm.pbf",
            "-o",
            "out",
            "--format",
            "geojson",
            "--min-key-count",
            "3",
            "--with-geometry",
            "--node-cache-mode",
            "sparse",
        ]);
        let overrides = cli.overrides();

        assert_eq!(cli.input, PathBuf::from("planet.osm.pbf"));
        assert_eq!(overrides.output_dir, Some(PathBuf::from("out")));
        assert_eq!(overrides.expressions_dir, None);
        assert_eq!(overrides.format, Some(OutputFormat::GeoJson));
        assert_eq!(overrides.min_key_count, Some(3));
        assert!(overrides.with_geometry);
        assert_eq!(overrides.node_cache_mode, Some(NodeCacheMode::Sparse));
    }

    #[test]
    fn jsonl_is_an_alias_for_geojsonl() {
        let cli = Cli::parse_from(["lpclass", "in.pbf", "--format", "jsonl"]);
        assert_eq!(cli.format, Some(OutputFormat::GeoJsonl));
    }

    #[test]
    fn open_channels_creates_six_files() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("nested/out");
        let settings = Settings::load(
            None,
            &Overrides {
                output_dir: Some(output_dir.clone()),
                ..Overrides::default()
            },
        )
        .unwrap();

        let _channels = open_channels(&settings).unwrap();
        for stem in [
            "lp-unknown",
            "lp-linestring",
            "lp-polygon",
            "lp-both",
            "lp-no-tags",
            "lp-error",
        ] {
            assert!(output_dir.join(format!("{stem}.geojsonl")).exists());
        }
    }
}
