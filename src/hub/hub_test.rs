use super::*;
use crate::event::{Data, EventKind, ItemKind};
use std::time::Duration;
use tokio::time::timeout;

fn hub_with_capacity(queue_capacity: usize) -> Hub {
    Hub::spawn(HubConfig { queue_capacity, command_capacity: 64, ping_interval: Duration::from_secs(30) })
}

fn card_event(board_id: i64, seq: i64) -> Event {
    Event::new(EventKind::Created, ItemKind::Card, board_id, Data::new()).with_data("seq", seq)
}

async fn recv_event(outbox: &mut Outbox) -> serde_json::Value {
    let message = timeout(Duration::from_millis(500), outbox.next())
        .await
        .expect("event receive timed out")
        .expect("outbox closed unexpectedly");
    serde_json::from_str(message.as_str()).expect("event is valid json")
}

async fn assert_no_event(outbox: &mut Outbox) {
    assert!(
        timeout(Duration::from_millis(80), outbox.next()).await.is_err(),
        "expected no event"
    );
}

async fn subscribe(hub: &Hub, board_id: i64) -> (ConnectionId, Outbox) {
    let (conn, outbox) = hub.open(board_id, Uuid::new_v4());
    let id = conn.id();
    hub.register(conn).await;
    (id, outbox)
}

#[tokio::test]
async fn publish_fans_out_to_every_subscriber_of_the_board() {
    let hub = hub_with_capacity(8);
    let (_, mut a) = subscribe(&hub, 1).await;
    let (_, mut b) = subscribe(&hub, 1).await;

    hub.publish(card_event(1, 0)).await;

    for outbox in [&mut a, &mut b] {
        let event = recv_event(outbox).await;
        assert_eq!(event["type"], "created_card");
        assert_eq!(event["board_id"], 1);
    }
}

#[tokio::test]
async fn publish_never_reaches_other_boards() {
    let hub = hub_with_capacity(8);
    let (_, mut on_a) = subscribe(&hub, 10).await;
    let (_, mut on_b) = subscribe(&hub, 20).await;

    hub.publish(card_event(10, 0)).await;

    assert_eq!(recv_event(&mut on_a).await["board_id"], 10);
    assert_no_event(&mut on_b).await;
}

#[tokio::test]
async fn events_arrive_once_and_in_submission_order() {
    let hub = hub_with_capacity(64);
    let (_, mut outbox) = subscribe(&hub, 3).await;

    for seq in 0..20 {
        hub.publish(card_event(3, seq)).await;
    }

    for seq in 0..20 {
        assert_eq!(recv_event(&mut outbox).await["data"]["seq"], seq);
    }
    assert_no_event(&mut outbox).await;
}

#[tokio::test]
async fn slow_consumer_is_evicted() {
    let hub = hub_with_capacity(2);
    let (_, mut slow) = subscribe(&hub, 4).await;
    let (_, mut fast) = subscribe(&hub, 4).await;

    for seq in 0..3 {
        hub.publish(card_event(4, seq)).await;
        // Keep the fast consumer drained so only the slow one overflows.
        assert_eq!(recv_event(&mut fast).await["data"]["seq"], seq);
    }

    assert_eq!(hub.subscriber_count(4).await, 1);

    hub.publish(card_event(4, 3)).await;
    assert_eq!(recv_event(&mut fast).await["data"]["seq"], 3);

    // Whatever was queued before eviction drains, then the queue ends.
    assert_eq!(recv_event(&mut slow).await["data"]["seq"], 0);
    assert_eq!(recv_event(&mut slow).await["data"]["seq"], 1);
    assert!(timeout(Duration::from_millis(200), slow.next()).await.expect("closed promptly").is_none());
}

#[tokio::test]
async fn unregister_is_idempotent_and_discards_empty_board() {
    let hub = hub_with_capacity(8);
    let (id, mut outbox) = subscribe(&hub, 5).await;
    assert_eq!(hub.board_count().await, 1);

    hub.unregister(5, id).await;
    hub.unregister(5, id).await;

    assert_eq!(hub.subscriber_count(5).await, 0);
    assert_eq!(hub.board_count().await, 0);
    assert!(outbox.next().await.is_none());
}

#[tokio::test]
async fn unregistered_connection_receives_nothing_more() {
    let hub = hub_with_capacity(8);
    let (id, mut gone) = subscribe(&hub, 6).await;
    let (_, mut stays) = subscribe(&hub, 6).await;

    hub.unregister(6, id).await;
    hub.publish(card_event(6, 1)).await;

    assert_eq!(recv_event(&mut stays).await["data"]["seq"], 1);
    assert!(gone.next().await.is_none());
}

#[tokio::test]
async fn publish_without_subscribers_leaves_hub_usable() {
    let hub = hub_with_capacity(8);
    hub.publish(card_event(7, 0)).await;
    assert_eq!(hub.board_count().await, 0);

    let (_, mut outbox) = subscribe(&hub, 7).await;
    hub.publish(card_event(7, 1)).await;
    assert_eq!(recv_event(&mut outbox).await["data"]["seq"], 1);
}

#[tokio::test]
async fn concurrent_publishers_never_duplicate() {
    let hub = hub_with_capacity(256);
    let (_, mut outbox) = subscribe(&hub, 8).await;

    let mut tasks = Vec::new();
    for worker in 0..4 {
        let hub = hub.clone();
        tasks.push(tokio::spawn(async move {
            for i in 0..25 {
                hub.publish(card_event(8, worker * 100 + i)).await;
            }
        }));
    }
    for task in tasks {
        task.await.expect("publisher task");
    }

    let mut seen = std::collections::HashSet::new();
    let mut last_per_worker = [-1_i64; 4];
    for _ in 0..100 {
        let seq = recv_event(&mut outbox).await["data"]["seq"].as_i64().expect("seq");
        assert!(seen.insert(seq), "duplicate event {seq}");
        // Per-publisher order is preserved through the hub.
        let worker = usize::try_from(seq / 100).expect("worker index");
        assert!(seq > last_per_worker[worker]);
        last_per_worker[worker] = seq;
    }
    assert_no_event(&mut outbox).await;
}

#[tokio::test]
async fn connection_closed_before_register_is_not_added() {
    let hub = hub_with_capacity(4);
    let (conn, outbox) = hub.open(9, Uuid::new_v4());
    drop(outbox);
    hub.register(conn).await;

    assert_eq!(hub.subscriber_count(9).await, 0);
    assert_eq!(hub.board_count().await, 0);
}
