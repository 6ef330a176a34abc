// src/lib.rs
//! socialgraph-crawler library: crawls a remote social graph into a store
//! and extracts size-bounded subgraphs from it.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `CrawlError`, `StoreError`, `FailureClass`
//! - **Configuration**: `CommandLineInput`, `CrawlConfig`, `ExtractConfig`
//! - **Domain model**: `Entity`, `Edge`, `Post`, `PageCursor`, `EntityId`, `EntityKey`
//! - **Remote source**: `RemoteSource`, `HttpRemoteSource`
//! - **Persistence**: `GraphStore`, `MemoryStore`
//! - **Crawl engine**: `Scheduler`, `WorkerPool`, `TaskQueue`, `PaginationTask`,
//!   `TimelineTask`
//! - **Extraction**: `SubgraphExtractor`, `EdgeSink`, `DelimitedEdgeWriter`

pub mod api;
pub mod config;
pub mod constants;
pub mod crawl;
pub mod error;
pub mod error_recovery;
pub mod logging;
pub mod model;
pub mod storage;
pub mod subgraph;
pub mod types;

// --- Error Handling ---
pub use crate::error::{CrawlError, FailureClass, RemoteErrorCode, StoreError};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{
    CommandLineInput, CrawlConfig, ExtractConfig, RemoteAccessConfig, SeedRef,
};

// --- Domain Model ---
pub use crate::model::{
    Edge, Entity, EntityMetadata, NextCursor, PageCursor, Post, Reachability,
};
pub use crate::types::{EntityId, EntityKey, PostId};

// --- Remote Source ---
pub use crate::api::{FetchedPage, HttpRemoteSource, RemoteSource, Timeline};

// --- Persistence ---
pub use crate::storage::{GraphStore, MemoryStore};

// --- Crawl Engine ---
pub use crate::crawl::{
    CrawlSummary, CrawlTask, PaginationState, PaginationTask, Scheduler, SchedulerSettings,
    TaskKind, TaskOutcome, TaskQueue, TimelineTask, WorkerPool,
};
pub use crate::error_recovery::CooldownPolicy;
pub use crate::logging::Logger;

// --- Extraction ---
pub use crate::subgraph::{
    DelimitedEdgeWriter, EdgeSink, ExtractionReport, ExtractionSettings, SubgraphExtractor,
};
