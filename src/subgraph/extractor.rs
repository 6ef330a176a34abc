// src/subgraph/extractor.rs
//! Streaming breadth-first subgraph extraction.
//!
//! Two halves joined by a bounded conduit:
//!
//! * the exploration actor (an async task) owns the frontier and the
//!   visited set, expands one node at a time and forwards every edge of the
//!   node into the conduit;
//! * the consumer (a blocking thread) drains the conduit into an
//!   [`EdgeSink`], flushing every `flush_every` rows and once more when the
//!   actor announces it has finished.
//!
//! The budget is checked only between nodes, so a node's edges are never
//! split. The frontier itself is unbounded; only the conduit applies
//! backpressure.

use super::sink::EdgeSink;
use crate::constants::{DEFAULT_SUBGRAPH_SIZE, EDGE_CONDUIT_CAPACITY, SINK_FLUSH_EVERY};
use crate::error::CrawlError;
use crate::logging::Logger;
use crate::model::Edge;
use crate::storage::GraphStore;
use crate::types::EntityId;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionSettings {
    /// Edge budget; traversal stops after the node that reaches it.
    pub budget: u64,
    pub flush_every: usize,
    pub conduit_capacity: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            budget: DEFAULT_SUBGRAPH_SIZE,
            flush_every: SINK_FLUSH_EVERY,
            conduit_capacity: EDGE_CONDUIT_CAPACITY,
        }
    }
}

/// What one extraction produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionReport {
    pub nodes_expanded: usize,
    /// Nodes whose edges could not be read and were treated as edge-less.
    pub nodes_skipped: usize,
    pub edges_written: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct ExplorationStats {
    nodes_expanded: usize,
    nodes_skipped: usize,
    edges_emitted: u64,
}

enum ConduitMessage {
    Edge(Edge),
    /// Sent exactly once, after the last edge.
    Finished(ExplorationStats),
}

pub struct SubgraphExtractor {
    store: Arc<dyn GraphStore>,
    settings: ExtractionSettings,
    log: Logger,
}

impl SubgraphExtractor {
    pub fn new(store: Arc<dyn GraphStore>, settings: ExtractionSettings, log: &Logger) -> Self {
        Self {
            store,
            settings,
            log: log.child("SubgraphExtractor"),
        }
    }

    /// Extracts the subgraph reachable from `from` into `sink`.
    ///
    /// Returns only after every emitted edge was written and flushed. The
    /// sink is handed back so callers can finish it.
    pub async fn extract<S>(&self, from: EntityId, sink: S) -> Result<(ExtractionReport, S), CrawlError>
    where
        S: EdgeSink + 'static,
    {
        let (tx, rx) = mpsc::channel(self.settings.conduit_capacity.max(1));

        let explorer = Explorer {
            store: Arc::clone(&self.store),
            budget: self.settings.budget,
            conduit: tx,
            log: self.log.child("explorer"),
        };
        let exploration = tokio::spawn(explorer.run(from));

        let flush_every = self.settings.flush_every.max(1);
        let consumer_log = self.log.child("sink");
        let consumption =
            tokio::task::spawn_blocking(move || drain_into(rx, sink, flush_every, &consumer_log));

        let explored = exploration.await.map_err(|e| CrawlError::Internal {
            message: format!("exploration actor ended abnormally: {}", e),
            source: None,
        })?;
        let (sink, drained) = consumption.await.map_err(|e| CrawlError::Internal {
            message: format!("sink consumer ended abnormally: {}", e),
            source: None,
        })?;
        // A sink failure closes the conduit under the explorer; report the
        // sink's error rather than the explorer's.
        let (rows, stats) = drained?;
        explored?;

        let report = ExtractionReport {
            nodes_expanded: stats.nodes_expanded,
            nodes_skipped: stats.nodes_skipped,
            edges_written: rows,
        };
        self.log.info(format_args!(
            "extracted {} edges from {} nodes ({} skipped)",
            report.edges_written, report.nodes_expanded, report.nodes_skipped
        ));
        Ok((report, sink))
    }
}

struct Explorer {
    store: Arc<dyn GraphStore>,
    budget: u64,
    conduit: mpsc::Sender<ConduitMessage>,
    log: Logger,
}

impl Explorer {
    async fn run(self, from: EntityId) -> Result<(), CrawlError> {
        let mut frontier = VecDeque::from([from]);
        let mut discovered = HashSet::from([from]);
        let mut visited = HashSet::new();
        let mut stats = ExplorationStats::default();

        while let Some(node) = frontier.pop_front() {
            if !visited.insert(node) {
                continue;
            }

            let edges = match self.store.get_outgoing_edges(node).await {
                Ok(edges) => edges,
                Err(err) => {
                    self.log
                        .warn(format_args!("skipping node {}, edges unreadable: {}", node, err));
                    stats.nodes_skipped += 1;
                    Vec::new()
                }
            };
            stats.nodes_expanded += 1;

            for edge in edges {
                if discovered.insert(edge.target) {
                    frontier.push_back(edge.target);
                }
                self.send(ConduitMessage::Edge(edge)).await?;
                stats.edges_emitted += 1;
            }

            if stats.edges_emitted >= self.budget {
                self.log.debug(format_args!(
                    "budget of {} reached at node {} ({} edges, {} nodes still queued)",
                    self.budget,
                    node,
                    stats.edges_emitted,
                    frontier.len()
                ));
                break;
            }
        }

        self.send(ConduitMessage::Finished(stats)).await
    }

    async fn send(&self, message: ConduitMessage) -> Result<(), CrawlError> {
        self.conduit
            .send(message)
            .await
            .map_err(|_| CrawlError::Internal {
                message: "edge conduit closed by the sink consumer".to_string(),
                source: None,
            })
    }
}

/// Writes conduit rows into the sink until the explorer finishes.
fn drain_into<S: EdgeSink>(
    mut rx: mpsc::Receiver<ConduitMessage>,
    mut sink: S,
    flush_every: usize,
    log: &Logger,
) -> (S, Result<(u64, ExplorationStats), CrawlError>) {
    let mut rows = 0u64;
    let mut pending = 0usize;

    let result = loop {
        match rx.blocking_recv() {
            Some(ConduitMessage::Edge(edge)) => {
                if let Err(err) = sink.write_edge(&edge) {
                    break Err(CrawlError::from(err));
                }
                rows += 1;
                pending += 1;
                if pending >= flush_every {
                    if let Err(err) = sink.flush() {
                        break Err(CrawlError::from(err));
                    }
                    log.debug(format_args!("flushed {} rows", rows));
                    pending = 0;
                }
            }
            Some(ConduitMessage::Finished(stats)) => {
                break sink.flush().map(|()| (rows, stats)).map_err(CrawlError::from);
            }
            None => {
                // Keep whatever arrived before the explorer went away.
                let flushed = sink.flush();
                break Err(match flushed {
                    Ok(()) => CrawlError::Internal {
                        message: format!("edge conduit closed after {} rows without completion", rows),
                        source: None,
                    },
                    Err(err) => CrawlError::from(err),
                });
            }
        }
    };

    (sink, result)
}
