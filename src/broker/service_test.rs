use crate::proto::ErrorCode;
use crate::proto::InstanceId;
use crate::proto::Outcome;
use crate::proto::Reply;
use crate::proto::Request;
use crate::proto::RequestEnvelope;
use crate::proto::ServerMessage;
use crate::proto::Value;
use crate::test_utils::counter_broker;
use crate::test_utils::counter_broker_with;
use crate::test_utils::drain;
use crate::test_utils::drain_events;
use crate::test_utils::open_session;
use crate::BrokerError;
use crate::SessionConfig;
use crate::COUNTER_TYPE;
use crate::COUNT_PROPERTY;

fn created(reply: Reply) -> InstanceId {
    match reply {
        Reply::Created { instance_id } => instance_id,
        other => panic!("expected Created, got {other:?}"),
    }
}

#[test]
fn full_lifecycle_through_requests() {
    let broker = counter_broker();
    let (session, mut rx) = open_session(&broker);

    let id = created(
        broker
            .handle(
                session,
                Request::CreateInstance {
                    type_name: COUNTER_TYPE.into(),
                },
            )
            .unwrap(),
    );
    broker
        .handle(
            session,
            Request::Subscribe {
                instance_id: id.clone(),
                property_name: COUNT_PROPERTY.into(),
            },
        )
        .unwrap();

    let reply = broker
        .handle(
            session,
            Request::ExecuteAction {
                instance_id: id.clone(),
                action_name: "increment".into(),
                args: vec![],
            },
        )
        .unwrap();
    assert_eq!(reply, Reply::ActionResult { result: Value::Int(1) });

    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].value, Value::Int(1));

    assert_eq!(
        broker.handle(
            session,
            Request::ReadProperty {
                instance_id: id.clone(),
                property_name: COUNT_PROPERTY.into(),
            }
        ),
        Ok(Reply::PropertyValue { value: Value::Int(1) })
    );

    assert_eq!(
        broker.handle(session, Request::RemoveInstance { instance_id: id.clone() }),
        Ok(Reply::Ok)
    );
    assert_eq!(
        broker.handle(
            session,
            Request::ExecuteAction {
                instance_id: id.clone(),
                action_name: "increment".into(),
                args: vec![],
            }
        ),
        Err(BrokerError::InstanceNotFound(id))
    );
}

#[test]
fn envelope_echoes_request_id_and_error_code() {
    let broker = counter_broker();
    let (session, _rx) = open_session(&broker);

    let response = broker.handle_envelope(
        session,
        RequestEnvelope {
            request_id: 42,
            request: Request::CreateInstance {
                type_name: "spaceship".into(),
            },
        },
    );

    assert_eq!(response.request_id, 42);
    match response.outcome {
        Outcome::Failure(payload) => {
            assert_eq!(payload.code, ErrorCode::UnknownType);
            assert!(payload.message.contains("spaceship"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn read_state_returns_snapshot() {
    let broker = counter_broker();
    let (session, _rx) = open_session(&broker);
    let id = broker.create_instance(session, COUNTER_TYPE).unwrap();
    broker.execute_action(&id, "add", vec![Value::Int(3)]).unwrap();

    match broker.handle(session, Request::ReadState { instance_id: id }).unwrap() {
        Reply::State { state } => assert_eq!(state.get(COUNT_PROPERTY), Some(&Value::Int(3))),
        other => panic!("expected State, got {other:?}"),
    }
}

#[test]
fn subscriber_of_a_does_not_see_b() {
    let broker = counter_broker();
    let (session, mut rx) = open_session(&broker);
    let a = broker.create_instance(session, COUNTER_TYPE).unwrap();
    let b = broker.create_instance(session, COUNTER_TYPE).unwrap();
    broker.subscribe(session, &a, COUNT_PROPERTY).unwrap();

    broker.execute_action(&b, "increment", vec![]).unwrap();
    broker.execute_action(&a, "increment", vec![]).unwrap();

    let events = drain_events(&mut rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].instance_id, a);
}

#[test]
fn other_session_sees_shared_instance_changes() {
    let broker = counter_broker();
    let (owner, _owner_rx) = open_session(&broker);
    let (watcher, mut watcher_rx) = open_session(&broker);

    let id = broker.create_instance(owner, COUNTER_TYPE).unwrap();
    broker.subscribe(watcher, &id, COUNT_PROPERTY).unwrap();
    broker.execute_action(&id, "increment", vec![]).unwrap();

    let events = drain_events(&mut watcher_rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].instance_id, id);
}

#[test]
fn close_session_releases_owned_instances() {
    let broker = counter_broker();
    let (a, _rx_a) = open_session(&broker);
    let (b, _rx_b) = open_session(&broker);
    let owned = broker.create_instance(a, COUNTER_TYPE).unwrap();
    let foreign = broker.create_instance(b, COUNTER_TYPE).unwrap();

    broker.close_session(a);

    assert_eq!(broker.read_property(&owned, COUNT_PROPERTY), Err(BrokerError::InstanceNotFound(owned)));
    assert!(broker.read_property(&foreign, COUNT_PROPERTY).is_ok());
    assert_eq!(broker.instance_count(), 1);
    assert_eq!(broker.session_count(), 1);
}

#[test]
fn close_session_keeps_instances_when_cleanup_disabled() {
    let broker = counter_broker_with(SessionConfig {
        cleanup_on_disconnect: false,
    });
    let (a, _rx) = open_session(&broker);
    let id = broker.create_instance(a, COUNTER_TYPE).unwrap();

    broker.close_session(a);
    broker.close_session(a);

    assert_eq!(broker.instances_of(a), vec![id.clone()]);
    assert!(broker.registry().lookup(&id).unwrap().subscribed_properties().is_empty());
}

#[test]
fn closed_session_is_detached_from_shared_subscriptions() {
    let broker = counter_broker();
    let (owner, mut owner_rx) = open_session(&broker);
    let (watcher, _watcher_rx) = open_session(&broker);
    let id = broker.create_instance(owner, COUNTER_TYPE).unwrap();
    broker.subscribe(owner, &id, COUNT_PROPERTY).unwrap();
    broker.subscribe(watcher, &id, COUNT_PROPERTY).unwrap();

    broker.close_session(watcher);
    broker.execute_action(&id, "increment", vec![]).unwrap();

    assert_eq!(broker.registry().lookup(&id).unwrap().subscribers(COUNT_PROPERTY), vec![owner]);
    assert_eq!(drain_events(&mut owner_rx).len(), 1);
}

#[test]
fn events_are_queued_before_remove_returns_and_none_after() {
    let broker = counter_broker();
    let (session, mut rx) = open_session(&broker);
    let id = broker.create_instance(session, COUNTER_TYPE).unwrap();
    broker.subscribe(session, &id, COUNT_PROPERTY).unwrap();
    let instance = broker.registry().lookup(&id).unwrap();

    broker.execute_action(&id, "increment", vec![]).unwrap();
    let response = broker.handle_envelope(
        session,
        RequestEnvelope {
            request_id: 7,
            request: Request::RemoveInstance { instance_id: id.clone() },
        },
    );
    assert!(response.is_success());

    let before = drain(&mut rx);
    assert_eq!(before.len(), 1);
    assert!(matches!(before[0], ServerMessage::PropertyChanged(_)));

    // A handle still referenced elsewhere keeps changing after removal.
    instance.handle().action("increment", vec![]).unwrap();
    assert!(drain(&mut rx).is_empty());
}
