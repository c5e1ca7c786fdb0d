mod app;
mod classify;
mod config;
mod dsl;
mod pipeline;
mod report;
mod rules;
mod sinks;
mod storage;
mod utils;
mod way;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::{Cli, classify_ways, index_nodes, open_channels};
use crate::config::Settings;
use crate::pipeline::WayRouter;
use crate::report::{write_json_report, write_report};
use crate::rules::MatcherSet;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose || cli.debug {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    if cli.debug {
        filter = filter.add_directive("lpclass=trace".parse()?);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("CLI: Failed to initialize thread pool")?;
    }

    let settings = Settings::load(cli.config.as_deref(), &cli.overrides())?;
    tracing::info!(
        "Config: expressions from {:?}, output to {:?} ({})",
        settings.expressions_dir,
        settings.output_dir,
        settings.format.extension()
    );

    let matchers = MatcherSet::load(|kind| settings.rule_path(kind))?;
    tracing::info!("Rules: {} expressions loaded", matchers.expression_count());

    let channels = open_channels(&settings)?;

    let start = std::time::Instant::now();
    let node_store = if settings.with_geometry {
        Some(index_nodes(&cli.input, settings.node_cache_mode)?)
    } else {
        None
    };

    let mut router = WayRouter::new(&matchers, channels);
    if let Some(node_store) = &node_store {
        router = router.with_node_store(node_store);
    }
    let way_count = classify_ways(&cli.input, &mut router)?;
    let (summary, unknown_keys) = router.finish()?;

    let elapsed = start.elapsed();
    tracing::info!(
        "Done! Classified {} ways in {:.2}s ({} distinct unknown keys)",
        way_count,
        elapsed.as_secs_f64(),
        unknown_keys.distinct_keys()
    );

    let keys = unknown_keys.top_keys(settings.min_key_count);
    let mut stdout = std::io::stdout().lock();
    write_report(&mut stdout, &summary, &keys).context("Report: Failed to write summary")?;

    if let Some(path) = &cli.report_json {
        write_json_report(path, &summary, settings.min_key_count, &keys)?;
    }

    Ok(())
}
