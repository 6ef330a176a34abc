// src/config.rs
use crate::constants::{
    DEFAULT_FAILURE_COOLDOWN, DEFAULT_LOW_WATER_MARK, DEFAULT_MAX_ATTEMPTS_PER_RUN,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_RATE_LIMIT_COOLDOWN, DEFAULT_REFILL_INTERVAL,
    DEFAULT_REMOTE_BASE_URL, DEFAULT_SUBGRAPH_SIZE, DEFAULT_WORKER_COUNT,
    EDGE_CONDUIT_CAPACITY, REMOTE_REQUEST_TIMEOUT, SINK_FLUSH_EVERY,
};
use crate::crawl::SchedulerSettings;
use crate::error::CrawlError;
use crate::error_recovery::CooldownPolicy;
use crate::subgraph::ExtractionSettings;
use crate::types::{EntityId, EntityKey};
use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default snapshot file shared by `crawl` and `extract`.
const DEFAULT_STORE_PATH: &str = "socialgraph.json";

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Paginate pending entities' listings (and requested timelines) into the store
    Crawl(CrawlArgs),
    /// Write a size-bounded breadth-first subgraph of the store to a file
    Extract(ExtractArgs),
}

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// JSON file with remote access settings (base URL, headers, cookies)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Snapshot file the graph is loaded from and saved to
    #[arg(short, long, default_value = DEFAULT_STORE_PATH)]
    pub store: String,

    /// Entity key to start from (repeatable, e.g. `--seed alice --seed bob`)
    #[arg(long = "seed")]
    pub seeds: Vec<String>,

    /// Entity key whose latest timeline page is downloaded (repeatable)
    #[arg(long = "timeline")]
    pub timelines: Vec<String>,

    /// Number of concurrent workers
    #[arg(short, long, default_value_t = DEFAULT_WORKER_COUNT)]
    pub workers: usize,

    /// Maximum number of queued tasks
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Queue depth below which the queue is refilled
    #[arg(long, default_value_t = DEFAULT_LOW_WATER_MARK)]
    pub low_water_mark: usize,

    /// Seconds between queue inspections
    #[arg(long, default_value_t = DEFAULT_REFILL_INTERVAL.as_secs())]
    pub refill_interval_secs: u64,

    /// Seconds a worker pauses after a rate limit (0 disables)
    #[arg(long, default_value_t = DEFAULT_RATE_LIMIT_COOLDOWN.as_secs())]
    pub rate_limit_cooldown_secs: u64,

    /// Seconds a worker pauses after a transient failure (0 disables)
    #[arg(long, default_value_t = DEFAULT_FAILURE_COOLDOWN.as_secs())]
    pub failure_cooldown_secs: u64,

    /// Failed attempts per entity before a finite run gives up on it
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS_PER_RUN)]
    pub max_attempts: u32,

    /// Keep polling for pending entities instead of stopping when none are left
    #[arg(long, default_value_t = false)]
    pub continuous: bool,

    /// Per-request network timeout in seconds (overrides the config file)
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Snapshot file written by `crawl`
    #[arg(short, long, default_value = DEFAULT_STORE_PATH)]
    pub store: String,

    /// Seed entity, as a numeric id or a key
    #[arg(short, long)]
    pub from: String,

    /// Edge budget of the subgraph
    #[arg(long, default_value_t = DEFAULT_SUBGRAPH_SIZE)]
    pub size: u64,

    /// Output file (defaults to `subgraph_<from>_<size>.csv`)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Rows written between flushes
    #[arg(long, default_value_t = SINK_FLUSH_EVERY)]
    pub flush_every: usize,
}

/// How to reach the remote source. Loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteAccessConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Extra request headers, sent verbatim.
    #[serde(default)]
    pub headers: IndexMap<String, String>,
    /// Session cookies, sent as one `Cookie` header.
    #[serde(default)]
    pub cookies: IndexMap<String, String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_REMOTE_BASE_URL.to_string()
}

impl Default for RemoteAccessConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            headers: IndexMap::new(),
            cookies: IndexMap::new(),
            timeout_secs: None,
        }
    }
}

impl RemoteAccessConfig {
    /// Reads and validates a remote access file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CrawlError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CrawlError::Configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            CrawlError::Configuration(format!("Invalid remote access file {}: {}", path.display(), e))
        })?;
        config.validated()
    }

    /// Base URLs get a trailing slash so endpoint paths join beneath them.
    fn validated(mut self) -> Result<Self, CrawlError> {
        let url = url::Url::parse(&self.base_url).map_err(|e| {
            CrawlError::Configuration(format!("Invalid base URL '{}': {}", self.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CrawlError::Configuration(format!(
                "Base URL must be http(s): {}",
                self.base_url
            )));
        }
        if !self.base_url.ends_with('/') {
            self.base_url.push('/');
        }
        Ok(self)
    }

    pub fn request_timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(REMOTE_REQUEST_TIMEOUT)
    }
}

/// Resolved `crawl` configuration, validated and ready to run.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub remote: RemoteAccessConfig,
    pub store_path: PathBuf,
    pub seeds: Vec<EntityKey>,
    pub timelines: Vec<EntityKey>,
    pub scheduler: SchedulerSettings,
}

impl CrawlConfig {
    pub fn resolve(args: CrawlArgs) -> Result<Self, CrawlError> {
        let mut remote = match &args.config {
            Some(path) => RemoteAccessConfig::load(path)?,
            None => RemoteAccessConfig::default(),
        };
        if let Some(secs) = args.timeout_secs {
            remote.timeout_secs = Some(secs);
        }

        let seeds = parse_keys(&args.seeds)?;
        let timelines = parse_keys(&args.timelines)?;

        let scheduler = SchedulerSettings {
            workers: args.workers,
            queue_capacity: args.queue_capacity,
            low_water_mark: args.low_water_mark,
            refill_interval: Duration::from_secs(args.refill_interval_secs),
            max_attempts: args.max_attempts,
            continuous: args.continuous,
            cooldown: CooldownPolicy::new(
                Duration::from_secs(args.rate_limit_cooldown_secs),
                Duration::from_secs(args.failure_cooldown_secs),
            ),
        };
        validate_scheduler(&scheduler)?;

        Ok(Self {
            remote,
            store_path: PathBuf::from(args.store),
            seeds,
            timelines,
            scheduler,
        })
    }
}

fn parse_keys(raw: &[String]) -> Result<Vec<EntityKey>, CrawlError> {
    Ok(raw
        .iter()
        .map(|s| EntityKey::parse(s))
        .collect::<Result<Vec<_>, _>>()?)
}

fn validate_scheduler(settings: &SchedulerSettings) -> Result<(), CrawlError> {
    if settings.workers == 0 {
        return Err(CrawlError::Configuration("--workers must be at least 1".into()));
    }
    if settings.queue_capacity == 0 {
        return Err(CrawlError::Configuration(
            "--queue-capacity must be at least 1".into(),
        ));
    }
    if settings.low_water_mark == 0 {
        return Err(CrawlError::Configuration(
            "--low-water-mark must be at least 1".into(),
        ));
    }
    if settings.low_water_mark > settings.queue_capacity {
        return Err(CrawlError::Configuration(format!(
            "--low-water-mark ({}) cannot exceed --queue-capacity ({})",
            settings.low_water_mark, settings.queue_capacity
        )));
    }
    if settings.refill_interval.is_zero() {
        return Err(CrawlError::Configuration(
            "--refill-interval-secs must be at least 1".into(),
        ));
    }
    if settings.max_attempts == 0 {
        return Err(CrawlError::Configuration("--max-attempts must be at least 1".into()));
    }
    Ok(())
}

/// The seed of an extraction, as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedRef {
    Id(EntityId),
    Key(EntityKey),
}

impl SeedRef {
    pub fn parse(input: &str) -> Result<Self, CrawlError> {
        match input.trim().parse::<EntityId>() {
            Ok(id) => Ok(SeedRef::Id(id)),
            Err(_) => Ok(SeedRef::Key(EntityKey::parse(input)?)),
        }
    }
}

impl std::fmt::Display for SeedRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedRef::Id(id) => write!(f, "{}", id),
            SeedRef::Key(key) => write!(f, "{}", key),
        }
    }
}

/// Resolved `extract` configuration.
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub store_path: PathBuf,
    pub from: SeedRef,
    pub output: PathBuf,
    pub settings: ExtractionSettings,
}

impl ExtractConfig {
    pub fn resolve(args: ExtractArgs) -> Result<Self, CrawlError> {
        let from = SeedRef::parse(&args.from)?;
        if args.size == 0 {
            return Err(CrawlError::Configuration("--size must be at least 1".into()));
        }
        if args.flush_every == 0 {
            return Err(CrawlError::Configuration(
                "--flush-every must be at least 1".into(),
            ));
        }

        let output = args
            .output
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("subgraph_{}_{}.csv", from, args.size)));

        Ok(Self {
            store_path: PathBuf::from(args.store),
            from,
            output,
            settings: ExtractionSettings {
                budget: args.size,
                flush_every: args.flush_every,
                conduit_capacity: EDGE_CONDUIT_CAPACITY,
            },
        })
    }
}
