// src/main.rs

use clap::Parser;
use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    append::file::FileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
    Config,
};
use socialgraph_crawler::config::Command;
use socialgraph_crawler::{
    CommandLineInput, CrawlConfig, CrawlError, DelimitedEdgeWriter, EntityId, ExtractConfig,
    GraphStore, HttpRemoteSource, Logger, MemoryStore, RemoteSource, Scheduler, SeedRef,
    StoreError, SubgraphExtractor,
};
use std::fs;
use std::sync::Arc;

/// Sets up logging configuration.
fn setup_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let log_file_path = std::env::temp_dir().join("socialgraph_crawler.log");
    if let Some(parent) = log_file_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let pattern = "{d(%Y-%m-%d %H:%M:%S)} [{l}] - {m}{n}";

    let stdout_appender = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build(&log_file_path)?;

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout_appender)))
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(LevelFilter::Debug)))
                .build("file", Box::new(file_appender)),
        )
        .build(
            Root::builder()
                .appender("stdout")
                .appender("file")
                .build(log_level),
        )?;

    log4rs::init_config(config)?;
    log::debug!("Logging initialized. Log file: {}", log_file_path.display());
    Ok(())
}

/// Crawls until the pending set is exhausted (or Ctrl-C), then saves the
/// store snapshot.
async fn run_crawl(config: CrawlConfig, log: &Logger) -> Result<(), CrawlError> {
    let store = Arc::new(MemoryStore::open(&config.store_path)?);
    let remote: Arc<dyn RemoteSource> =
        Arc::new(HttpRemoteSource::new(&config.remote, log.child("HttpRemoteSource"))?);

    let scheduler = Scheduler::new(
        config.scheduler.clone(),
        Arc::clone(&store) as Arc<dyn GraphStore>,
        remote,
        log,
    )
    .with_timelines(config.timelines.clone());

    tokio::select! {
        result = scheduler.run(&config.seeds) => {
            let summary = result?;
            println!("Crawl finished: {}", summary);
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            log.warn(format_args!("interrupted, saving what was crawled so far"));
        }
    }

    store.save(&config.store_path)?;
    println!(
        "✓ Store saved to {} ({} entities, {} edges, {} posts)",
        config.store_path.display(),
        store.entity_count(),
        store.edge_count(),
        store.post_count()
    );
    Ok(())
}

/// Streams a bounded subgraph of the stored graph into the output file.
async fn run_extract(config: ExtractConfig, log: &Logger) -> Result<(), CrawlError> {
    if !config.store_path.exists() {
        return Err(CrawlError::Configuration(format!(
            "No store snapshot at {}; run `crawl` first",
            config.store_path.display()
        )));
    }
    let store = Arc::new(MemoryStore::open(&config.store_path)?);
    let from = resolve_seed(store.as_ref(), &config.from).await?;

    let sink = DelimitedEdgeWriter::create(&config.output)?;
    let extractor = SubgraphExtractor::new(store, config.settings, log);
    let (report, writer) = extractor.extract(from, sink).await?;
    writer.into_inner()?.sync_all()?;

    println!(
        "✓ Wrote {} edges from {} nodes to {}",
        report.edges_written,
        report.nodes_expanded,
        config.output.display()
    );
    if report.nodes_skipped > 0 {
        println!("  {} nodes could not be read and were skipped", report.nodes_skipped);
    }
    Ok(())
}

async fn resolve_seed(store: &MemoryStore, seed: &SeedRef) -> Result<EntityId, CrawlError> {
    match seed {
        SeedRef::Id(id) => Ok(*id),
        SeedRef::Key(key) => store
            .get_entity_by_key(key)
            .await?
            .map(|entity| entity.id())
            .ok_or_else(|| StoreError::NotFound(key.to_string()).into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CommandLineInput::parse();
    setup_logging(cli.verbose)?;
    let log = Logger::new("socialgraph-crawler");

    let result = match cli.command {
        Command::Crawl(args) => match CrawlConfig::resolve(args) {
            Ok(config) => run_crawl(config, &log).await,
            Err(e) => Err(e),
        },
        Command::Extract(args) => match ExtractConfig::resolve(args) {
            Ok(config) => run_extract(config, &log).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        log.error(format_args!("{}", e));
        return Err(e.into());
    }
    Ok(())
}
