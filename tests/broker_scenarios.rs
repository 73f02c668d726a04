//! End-to-end behavior of the broker through in-process sessions.

mod common;

use std::collections::HashSet;

use common::counter_broker;
use common::eventually;
use common::in_process_client;
use common::Recorder;
use vm_broker::proto::ErrorCode;
use vm_broker::proto::Value;

#[tokio::test]
async fn created_ids_are_distinct() {
    let broker = counter_broker();
    let client = in_process_client(&broker);

    let mut ids = HashSet::new();
    for _ in 0..50 {
        assert!(ids.insert(client.create_instance("counter").await.unwrap()));
    }
    assert_eq!(broker.instance_count(), 50);
}

#[tokio::test]
async fn removed_instance_rejects_every_operation() {
    let broker = counter_broker();
    let client = in_process_client(&broker);
    let counter = client.create("counter").await.unwrap();
    let id = counter.id().clone();

    counter.remove().await.unwrap();

    let errors = vec![
        client.execute_action(&id, "increment", vec![]).await.unwrap_err(),
        client.read_property(&id, "count").await.unwrap_err(),
        client.read_state(&id).await.unwrap_err(),
        client.subscribe(&id, "count").await.unwrap_err(),
        client.remove_instance(&id).await.unwrap_err(),
    ];
    for err in errors {
        assert_eq!(err.code(), Some(ErrorCode::InstanceNotFound));
    }
}

#[tokio::test]
async fn double_subscribe_delivers_each_change_once() {
    let broker = counter_broker();
    let client = in_process_client(&broker);
    let counter = client.create("counter").await.unwrap();
    let recorder = Recorder::default();

    client.subscribe(counter.id(), "count").await.unwrap();
    let _guard = counter
        .add_property_listener("count", recorder.callback())
        .await
        .unwrap();
    client.subscribe(counter.id(), "count").await.unwrap();

    counter.action("increment", vec![]).await.unwrap();

    assert!(eventually(|| !recorder.values().is_empty()).await);
    assert_eq!(recorder.values(), vec![Value::Int(1)]);
}

#[tokio::test]
async fn no_events_arrive_after_remove_returns() {
    let broker = counter_broker();
    let client = in_process_client(&broker);
    let counter = client.create("counter").await.unwrap();
    let recorder = Recorder::default();
    let _guard = counter
        .add_property_listener("count", recorder.callback())
        .await
        .unwrap();

    counter.action("increment", vec![]).await.unwrap();
    counter.action("increment", vec![]).await.unwrap();
    counter.clone().remove().await.unwrap();

    let seen = recorder.values();
    assert_eq!(seen, vec![Value::Int(1), Value::Int(2)]);
    assert!(counter.action("increment", vec![]).await.is_err());
    assert_eq!(recorder.values(), seen);
}

#[tokio::test]
async fn subscriber_of_one_instance_never_sees_another() {
    let broker = counter_broker();
    let client = in_process_client(&broker);
    let a = client.create("counter").await.unwrap();
    let b = client.create("counter").await.unwrap();
    let recorder = Recorder::default();
    let _guard = a.add_property_listener("count", recorder.callback()).await.unwrap();

    b.action("add", vec![Value::Int(10)]).await.unwrap();
    a.action("add", vec![Value::Int(1)]).await.unwrap();

    assert!(eventually(|| !recorder.values().is_empty()).await);
    assert_eq!(recorder.values(), vec![Value::Int(1)]);
}

#[tokio::test]
async fn unknown_action_leaves_state_untouched() {
    let broker = counter_broker();
    let client = in_process_client(&broker);
    let counter = client.create("counter").await.unwrap();
    counter.action("add", vec![Value::Int(3)]).await.unwrap();

    let err = counter.action("multiply", vec![Value::Int(2)]).await.unwrap_err();

    assert_eq!(err.code(), Some(ErrorCode::ActionNotFound));
    assert_eq!(counter.get_prop("count").await.unwrap(), Value::Int(3));
}

#[tokio::test]
async fn bad_argument_is_an_execution_failure() {
    let broker = counter_broker();
    let client = in_process_client(&broker);
    let counter = client.create("counter").await.unwrap();

    let err = counter.action("add", vec![Value::Bool(true)]).await.unwrap_err();

    assert_eq!(err.code(), Some(ErrorCode::ActionExecutionFailed));
    assert_eq!(counter.get_prop("count").await.unwrap(), Value::Int(0));
}

#[tokio::test]
async fn clients_observe_a_shared_instance_independently() {
    let broker = counter_broker();
    let owner = in_process_client(&broker);
    let watcher = in_process_client(&broker);
    let counter = owner.create("counter").await.unwrap();

    let owner_seen = Recorder::default();
    let watcher_seen = Recorder::default();
    let _g1 = counter
        .add_property_listener("count", owner_seen.callback())
        .await
        .unwrap();
    let _g2 = watcher
        .add_property_listener(counter.id(), "count", watcher_seen.callback())
        .await
        .unwrap();

    watcher.execute_action(counter.id(), "increment", vec![]).await.unwrap();

    assert!(eventually(|| owner_seen.values().len() == 1 && watcher_seen.values().len() == 1).await);
}

#[tokio::test]
async fn dropping_a_client_releases_its_instances() {
    let broker = counter_broker();
    let survivor = in_process_client(&broker);
    let kept = survivor.create_instance("counter").await.unwrap();

    let leaving = in_process_client(&broker);
    for _ in 0..3 {
        leaving.create_instance("counter").await.unwrap();
    }
    assert_eq!(broker.instance_count(), 4);

    drop(leaving);

    assert!(eventually(|| broker.instance_count() == 1).await);
    assert_eq!(survivor.read_property(&kept, "count").await.unwrap(), Value::Int(0));
}

#[tokio::test]
async fn concurrent_creates_and_removes_stay_consistent() {
    let broker = counter_broker();
    let client = in_process_client(&broker);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move {
                let id = client.create_instance("counter").await.unwrap();
                client.execute_action(&id, "increment", vec![]).await.unwrap();
                client.remove_instance(&id).await.unwrap();
                id
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        assert!(ids.insert(task.await.unwrap()));
    }
    assert_eq!(broker.instance_count(), 0);
}
