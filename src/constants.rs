// src/constants.rs
//! Domain constants that define the operational boundaries of the crawler.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role. Reading these constants should tell you how the crawler
//! paces itself against the remote source and how the extractor batches
//! its output.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Remote source boundaries
// ---------------------------------------------------------------------------

/// How many related entities one page request asks for.
pub const REMOTE_PAGE_SIZE: u32 = 20;

/// How many posts one timeline request asks for.
pub const REMOTE_TIMELINE_SIZE: u32 = 200;

/// Fixed network timeout carried by every remote call.
///
/// The remote source is unreliable. A call that exceeds this is treated
/// as a transient failure and the task aborts.
pub const REMOTE_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Cursor the wire protocol uses to request the first page of a listing.
pub const WIRE_FIRST_PAGE_CURSOR: &str = "-1";

/// Cursor the wire protocol returns when a listing has no more pages.
pub const WIRE_END_OF_LISTING_CURSOR: &str = "0";

/// Default base URL of the remote social-graph API.
pub const DEFAULT_REMOTE_BASE_URL: &str = "https://api.twitter.com/1.1/";

// ---------------------------------------------------------------------------
// Scheduling boundaries
// ---------------------------------------------------------------------------

/// How long the scheduler waits for a worker signal before inspecting
/// queue depth.
pub const DEFAULT_REFILL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of workers pulling from the task queue.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default task queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default queue depth below which a refill is triggered.
pub const DEFAULT_LOW_WATER_MARK: usize = 20;

/// How long a worker stays away from the remote source after a rate limit.
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// How long a worker pauses after a transient failure.
pub const DEFAULT_FAILURE_COOLDOWN: Duration = Duration::from_secs(15);

/// How many aborted attempts an entity gets within one finite crawl run.
pub const DEFAULT_MAX_ATTEMPTS_PER_RUN: u32 = 3;

// ---------------------------------------------------------------------------
// Subgraph extraction boundaries
// ---------------------------------------------------------------------------

/// Default edge budget of an extracted subgraph.
pub const DEFAULT_SUBGRAPH_SIZE: u64 = 1000;

/// Number of rows written between sink flushes.
pub const SINK_FLUSH_EVERY: usize = 1000;

/// Capacity of the conduit between the exploration actor and the sink
/// consumer.
pub const EDGE_CONDUIT_CAPACITY: usize = 1000;
