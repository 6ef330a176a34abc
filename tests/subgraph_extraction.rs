// tests/subgraph_extraction.rs
//! Breadth-first extraction over stored graphs with cycles and failures.

use pretty_assertions::assert_eq;
use socialgraph_crawler::{
    CrawlError, DelimitedEdgeWriter, Edge, EdgeSink, Entity, EntityId, EntityKey,
    ExtractionSettings, GraphStore, Logger, MemoryStore, Post, StoreError, SubgraphExtractor,
};
use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct CollectingSink {
    rows: Vec<Edge>,
    flushes: usize,
}

impl EdgeSink for CollectingSink {
    fn write_edge(&mut self, edge: &Edge) -> io::Result<()> {
        self.rows.push(*edge);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Sink that rejects writes after accepting a few rows.
struct FailingSink {
    accepted: usize,
    limit: usize,
}

impl EdgeSink for FailingSink {
    fn write_edge(&mut self, _edge: &Edge) -> io::Result<()> {
        if self.accepted == self.limit {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.accepted += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Store whose edge lookups fail for one entity.
struct FlakyStore {
    inner: MemoryStore,
    broken: EntityId,
}

#[async_trait::async_trait]
impl GraphStore for FlakyStore {
    async fn add_entities(&self, batch: &[Entity]) -> Result<(), StoreError> {
        self.inner.add_entities(batch).await
    }

    async fn add_edges(&self, batch: &[Edge]) -> Result<(), StoreError> {
        self.inner.add_edges(batch).await
    }

    async fn update_entity_state(&self, entity: &Entity) -> Result<(), StoreError> {
        self.inner.update_entity_state(entity).await
    }

    async fn get_entity_by_key(&self, key: &EntityKey) -> Result<Option<Entity>, StoreError> {
        self.inner.get_entity_by_key(key).await
    }

    async fn list_pending_entities(&self, limit: usize) -> Result<Vec<Entity>, StoreError> {
        self.inner.list_pending_entities(limit).await
    }

    async fn get_outgoing_edges(&self, id: EntityId) -> Result<Vec<Edge>, StoreError> {
        if id == self.broken {
            return Err(StoreError::Unavailable("simulated outage".into()));
        }
        self.inner.get_outgoing_edges(id).await
    }

    async fn add_posts(&self, batch: &[Post]) -> Result<(), StoreError> {
        self.inner.add_posts(batch).await
    }

    async fn get_posts(&self, author: EntityId) -> Result<Vec<Post>, StoreError> {
        self.inner.get_posts(author).await
    }
}

fn edge(source: u64, target: u64) -> Edge {
    Edge::new(EntityId::new(source), EntityId::new(target))
}

async fn memory_store(edges: &[(u64, u64)]) -> MemoryStore {
    let store = MemoryStore::new();
    let edges: Vec<Edge> = edges.iter().map(|(s, t)| edge(*s, *t)).collect();
    store.add_edges(&edges).await.unwrap();
    store
}

fn settings(budget: u64) -> ExtractionSettings {
    ExtractionSettings {
        budget,
        flush_every: 4,
        conduit_capacity: 2,
    }
}

#[tokio::test]
async fn budget_stops_after_the_node_that_reaches_it() {
    // 1 -> {2,3,4}, 2 -> {1,3,5}, 3 -> {1,6,7,8}, 4 -> {9}. Cycles back to 1
    // and 3. Cumulative edges after each node: 3, 6, 10.
    let store = memory_store(&[
        (1, 2),
        (1, 3),
        (1, 4),
        (2, 1),
        (2, 3),
        (2, 5),
        (3, 1),
        (3, 6),
        (3, 7),
        (3, 8),
        (4, 9),
    ])
    .await;
    let extractor = SubgraphExtractor::new(Arc::new(store), settings(10), &Logger::new("test"));

    let (report, sink) = extractor
        .extract(EntityId::new(1), CollectingSink::default())
        .await
        .unwrap();

    assert_eq!(report.nodes_expanded, 3);
    assert_eq!(report.edges_written, 10);
    assert_eq!(
        sink.rows,
        vec![
            edge(1, 2),
            edge(1, 3),
            edge(1, 4),
            edge(2, 1),
            edge(2, 3),
            edge(2, 5),
            edge(3, 1),
            edge(3, 6),
            edge(3, 7),
            edge(3, 8),
        ]
    );
    let unique: HashSet<_> = sink.rows.iter().collect();
    assert_eq!(unique.len(), sink.rows.len(), "every edge arrives exactly once");
    assert!(sink.flushes >= 1);
}

#[tokio::test]
async fn node_crossing_the_budget_is_written_whole() {
    // Node 1 has 8 edges, node 2 has 6: after node 1 the total is 8 (< 10),
    // node 2 brings it to 14 and nothing after it is expanded.
    let mut edges: Vec<(u64, u64)> = (2..=9).map(|t| (1, t)).collect();
    edges.extend((20..26).map(|t| (2, t)));
    edges.extend([(3, 30), (3, 31)]);
    let store = memory_store(&edges).await;
    let extractor = SubgraphExtractor::new(Arc::new(store), settings(10), &Logger::new("test"));

    let (report, sink) = extractor
        .extract(EntityId::new(1), CollectingSink::default())
        .await
        .unwrap();

    assert_eq!(report.nodes_expanded, 2);
    assert_eq!(report.edges_written, 14);
    let from_two: Vec<Edge> = sink
        .rows
        .iter()
        .copied()
        .filter(|e| e.source == EntityId::new(2))
        .collect();
    assert_eq!(from_two, (20..26).map(|t| edge(2, t)).collect::<Vec<_>>());
    assert!(sink.rows.iter().all(|e| e.source != EntityId::new(3)));
}

#[tokio::test]
async fn sink_failure_fails_the_extraction_with_the_sink_error() {
    // More edges than the conduit holds, so the explorer is mid-send when
    // the sink gives up.
    let edges: Vec<(u64, u64)> = (2..40).map(|t| (1, t)).collect();
    let store = memory_store(&edges).await;
    let extractor = SubgraphExtractor::new(Arc::new(store), settings(1000), &Logger::new("test"));

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        extractor.extract(EntityId::new(1), FailingSink { accepted: 0, limit: 3 }),
    )
    .await
    .expect("a failing sink must not leave the explorer blocked");

    match result {
        Err(CrawlError::Io(err)) => assert_eq!(err.to_string(), "disk full"),
        Err(other) => panic!("expected the sink's IO error, got {}", other),
        Ok(_) => panic!("extraction should fail when the sink cannot be written"),
    }
}

#[tokio::test]
async fn cycles_never_expand_a_node_twice() {
    let store = memory_store(&[(1, 2), (2, 3), (3, 1), (3, 2)]).await;
    let extractor = SubgraphExtractor::new(Arc::new(store), settings(100), &Logger::new("test"));

    let (report, sink) = extractor
        .extract(EntityId::new(1), CollectingSink::default())
        .await
        .unwrap();

    assert_eq!(report.nodes_expanded, 3);
    assert_eq!(sink.rows, vec![edge(1, 2), edge(2, 3), edge(3, 1), edge(3, 2)]);
}

#[tokio::test]
async fn unreadable_node_is_skipped_and_traversal_continues() {
    let store = FlakyStore {
        inner: memory_store(&[(1, 2), (1, 3), (2, 4), (3, 5)]).await,
        broken: EntityId::new(2),
    };
    let extractor = SubgraphExtractor::new(Arc::new(store), settings(100), &Logger::new("test"));

    let (report, sink) = extractor
        .extract(EntityId::new(1), CollectingSink::default())
        .await
        .unwrap();

    assert_eq!(report.nodes_skipped, 1);
    assert_eq!(report.edges_written, 3);
    assert_eq!(sink.rows, vec![edge(1, 2), edge(1, 3), edge(3, 5)]);
}

#[tokio::test]
async fn edges_are_written_to_a_delimited_file() {
    let store = memory_store(&[(10, 20), (10, 30), (20, 30)]).await;
    let path = std::env::temp_dir().join(format!("subgraph_test_{}.csv", std::process::id()));
    let extractor = SubgraphExtractor::new(Arc::new(store), settings(100), &Logger::new("test"));

    let writer = DelimitedEdgeWriter::create(&path).unwrap();
    let (report, writer) = extractor.extract(EntityId::new(10), writer).await.unwrap();
    drop(writer.into_inner().unwrap());

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, "10,20\n10,30\n20,30\n");
    assert_eq!(report.edges_written, 3);

    let _ = std::fs::remove_file(&path);
}
