// tests/scheduler_refill.rs
//! Scheduler refill discipline and full crawl runs.

mod common;

use common::{key, meta, page, pending, post, ScriptedRemote};
use pretty_assertions::assert_eq;
use socialgraph_crawler::crawl::OutcomeCounts;
use socialgraph_crawler::{
    CooldownPolicy, EntityId, GraphStore, Logger, MemoryStore, PageCursor, RemoteSource,
    Scheduler, SchedulerSettings, Timeline,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn settings(capacity: usize, low_water_mark: usize) -> SchedulerSettings {
    SchedulerSettings {
        workers: 2,
        queue_capacity: capacity,
        low_water_mark,
        refill_interval: Duration::from_millis(20),
        max_attempts: 2,
        continuous: false,
        cooldown: CooldownPolicy::none(),
    }
}

async fn store_with_pending(count: u64) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let entities: Vec<_> = (1..=count).map(|i| pending(i, &format!("user{}", i))).collect();
    store.add_entities(&entities).await.unwrap();
    store
}

fn scheduler(store: &Arc<MemoryStore>, settings: SchedulerSettings) -> Scheduler {
    let remote: Arc<dyn RemoteSource> = Arc::new(ScriptedRemote::new());
    Scheduler::new(
        settings,
        Arc::clone(store) as Arc<dyn GraphStore>,
        remote,
        &Logger::new("test"),
    )
}

#[tokio::test]
async fn refill_fills_free_slots_without_duplicating_in_flight_entities() {
    let store = store_with_pending(30).await;
    let scheduler = scheduler(&store, settings(10, 5));

    assert_eq!(scheduler.refill().await.unwrap(), 10);
    assert_eq!(scheduler.queue().depth(), 10);

    // Workers claim four tasks; they stay in flight.
    let mut seen = HashSet::new();
    for _ in 0..4 {
        let task = scheduler.queue().pop().await.unwrap();
        assert!(seen.insert(task.entity_key().clone()));
    }
    assert_eq!(scheduler.queue().depth(), 6);

    assert_eq!(scheduler.refill().await.unwrap(), 4);
    assert_eq!(scheduler.queue().depth(), 10);
    while scheduler.queue().depth() > 0 {
        let task = scheduler.queue().pop().await.unwrap();
        assert!(
            seen.insert(task.entity_key().clone()),
            "entity {} was enqueued twice while in flight",
            task.entity_key()
        );
    }
    assert_eq!(seen.len(), 14);
    assert_eq!(scheduler.ledger().in_flight_count(), 14);
}

#[tokio::test]
async fn refill_is_bounded_by_the_pending_set() {
    let store = store_with_pending(3).await;
    let scheduler = scheduler(&store, settings(10, 5));

    assert_eq!(scheduler.refill().await.unwrap(), 3);
    assert_eq!(scheduler.refill().await.unwrap(), 0);
    assert_eq!(scheduler.queue().depth(), 3);
}

#[tokio::test]
async fn seeds_already_in_flight_are_not_enqueued_twice() {
    let store = Arc::new(MemoryStore::new());
    let scheduler = scheduler(&store, settings(10, 5));

    let seeded = scheduler.seed(&[key("alice"), key("bob"), key("alice")]).await;
    assert_eq!(seeded, 2);
    assert_eq!(scheduler.queue().depth(), 2);
}

#[tokio::test]
async fn finite_crawl_runs_until_the_pending_set_is_exhausted() {
    let store = Arc::new(MemoryStore::new());
    // alice has two pages listing bob and carol; bob keeps failing
    // transiently, carol denies access.
    let remote: Arc<dyn RemoteSource> = Arc::new(
        ScriptedRemote::new()
            .with_metadata(meta(1, "alice"))
            .with_pages(
                1,
                vec![page(vec![meta(2, "bob")], Some("c1")), page(vec![meta(3, "carol")], None)],
            )
            .always_fail(2, 500)
            .always_fail(3, 403),
    );
    let scheduler = Scheduler::new(
        settings(4, 2),
        Arc::clone(&store) as Arc<dyn GraphStore>,
        remote,
        &Logger::new("test"),
    );

    let summary = tokio::time::timeout(Duration::from_secs(10), scheduler.run(&[key("alice")]))
        .await
        .expect("finite crawl must terminate")
        .unwrap();

    assert_eq!(summary.workers_finished, 2);
    // bob is given up after two transient aborts.
    assert_eq!(
        summary.outcomes,
        OutcomeCounts {
            completed: 1,
            terminal: 1,
            aborted: 2,
            failed: 0,
            skipped: 0,
        }
    );

    assert_eq!(
        store.get_entity(EntityId::new(1)).unwrap().cursor,
        PageCursor::Complete
    );
    assert!(store.get_entity(EntityId::new(2)).unwrap().is_pending());
    assert!(!store.get_entity(EntityId::new(3)).unwrap().is_pending());
    assert_eq!(store.edge_count(), 2);
}

#[tokio::test]
async fn finite_run_with_zero_low_water_mark_still_terminates() {
    let store = Arc::new(MemoryStore::new());
    let remote: Arc<dyn RemoteSource> = Arc::new(
        ScriptedRemote::new()
            .with_metadata(meta(1, "alice"))
            .with_pages(1, vec![page(Vec::new(), None)]),
    );
    let scheduler = Scheduler::new(
        settings(4, 0),
        Arc::clone(&store) as Arc<dyn GraphStore>,
        remote,
        &Logger::new("test"),
    );

    let summary = tokio::time::timeout(Duration::from_secs(2), scheduler.run(&[key("alice")]))
        .await
        .expect("an empty queue must be refilled and then closed")
        .unwrap();

    assert_eq!(summary.outcomes.completed, 1);
    assert_eq!(
        store.get_entity(EntityId::new(1)).unwrap().cursor,
        PageCursor::Complete
    );
}

#[tokio::test]
async fn timeline_seeds_run_alongside_follower_seeds() {
    let store = Arc::new(MemoryStore::new());
    let remote: Arc<dyn RemoteSource> = Arc::new(
        ScriptedRemote::new()
            .with_metadata(meta(1, "alice"))
            .with_metadata(meta(2, "bob"))
            .with_timeline(
                2,
                Timeline {
                    posts: vec![post(21, 2, "first"), post(22, 2, "second")],
                    authors: Vec::new(),
                },
            ),
    );
    let scheduler = Scheduler::new(
        settings(4, 2),
        Arc::clone(&store) as Arc<dyn GraphStore>,
        remote,
        &Logger::new("test"),
    )
    .with_timelines(vec![key("bob")]);

    let summary = tokio::time::timeout(Duration::from_secs(5), scheduler.run(&[key("alice")]))
        .await
        .expect("finite crawl must terminate")
        .unwrap();

    // Bootstrapping bob for his timeline also made him pending, so the
    // refill paginates his (empty) listing as well.
    assert_eq!(summary.outcomes.completed, 3);
    assert_eq!(
        store.get_entity(EntityId::new(2)).unwrap().cursor,
        PageCursor::Complete
    );
    assert_eq!(store.post_count(), 2);
    let newest = store.get_posts(EntityId::new(2)).await.unwrap();
    assert_eq!(newest[0].text, "second");
}
