//! Runs against a live Redis only when `HERALD_TEST_REDIS_URL` is set.
#![cfg(feature = "redis")]

use std::time::Duration;

use herald_queue::{EventQueue, RedisQueue};
use herald_types::{Event, Payload};

fn event(id: i64) -> Event {
    Event {
        id,
        event_type: "like".to_string(),
        actor_id: 1,
        target_id: 2,
        data: Payload::new(),
        processed: false,
        created_at: "2025-01-01T00:00:00.000Z".to_string(),
    }
}

#[tokio::test]
async fn lpush_brpop_round_trip_is_fifo() {
    let Ok(url) = std::env::var("HERALD_TEST_REDIS_URL") else {
        eprintln!("HERALD_TEST_REDIS_URL not set; skipping");
        return;
    };
    let key = format!("herald_test_{}", std::process::id());
    let queue = RedisQueue::connect(&url, key.clone()).await.unwrap();
    assert_eq!(queue.name(), key);

    queue.push(&event(1)).await.unwrap();
    queue.push(&event(2)).await.unwrap();

    let first = queue.pop_blocking(Duration::from_secs(1)).await.unwrap();
    let second = queue.pop_blocking(Duration::from_secs(1)).await.unwrap();
    let empty = queue.pop_blocking(Duration::ZERO).await.unwrap();

    assert_eq!(first.map(|e| e.id), Some(1));
    assert_eq!(second.map(|e| e.id), Some(2));
    assert!(empty.is_none());
}
