use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tower_adapters_core::EventListeners;
use tower_adapters_dial::DialPolicy;
use tower_adapters_service::{
    AdapterError, CloseEvent, ConnectionEvent, ConnectionState, CredentialSettings,
    EndpointSettings, ServiceCore, ServiceOption,
};

use super::support::{MockConnector, settings};

fn redis(connector: MockConnector) -> ServiceCore<CredentialSettings, MockConnector> {
    ServiceCore::builder(connector, CredentialSettings::new("localhost:6379"))
        .name("redis")
        .dial_policy(DialPolicy::periodic(1, Duration::from_millis(1)))
        .build()
}

#[tokio::test]
async fn unchanged_settings_keep_connection() {
    let connector = MockConnector::new();
    let core = redis(connector.clone());
    core.dial().await.unwrap();
    let mut listener = core.listen();

    let changed = core
        .config(&settings(&[("endpoint", "localhost:6379"), ("db", "0")]))
        .await
        .unwrap();

    assert!(!changed);
    assert!(core.is_connected());
    assert_eq!(listener.try_event(), None);
    assert_eq!(connector.closes(), 0);
}

#[tokio::test]
async fn changed_key_resets_connection_once() {
    let connector = MockConnector::new();
    let core = redis(connector.clone());
    core.dial().await.unwrap();

    let listeners: Vec<_> = (0..3).map(|_| core.listen()).collect();
    let resets = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&resets);
    core.on_close(move |event| {
        if event.is_reset() {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    assert!(core.config(&settings(&[("db", "4")])).await.unwrap());

    for listener in listeners {
        assert_eq!(listener.await, CloseEvent::Reset);
    }
    assert_eq!(resets.load(Ordering::SeqCst), 1);
    assert_eq!(core.state(), ConnectionState::Disconnected);
    assert_eq!(connector.closes(), 1);
}

#[tokio::test]
async fn redial_uses_new_settings() {
    let connector = MockConnector::new();
    let core = redis(connector.clone());
    core.dial().await.unwrap();

    core.config(&settings(&[("endpoint", "cache:6380"), ("password", "hunter2")]))
        .await
        .unwrap();
    core.dial().await.unwrap();

    let targets = connector.targets();
    assert!(targets[0].contains("localhost:6379"));
    assert!(targets[1].contains("cache:6380"));
    // the password is masked in the target's Debug output
    assert!(!targets[1].contains("hunter2"));
    assert_eq!(core.settings().await.secret(), Some("hunter2"));
}

#[tokio::test]
async fn change_while_disconnected_notifies_nobody() {
    let core = redis(MockConnector::new());
    let mut listener = core.listen();

    assert!(core.config(&settings(&[("db", "2")])).await.unwrap());

    assert_eq!(listener.try_event(), None);
    assert_eq!(core.settings().await.db_index(), 2);
}

#[tokio::test]
async fn malformed_value_applies_nothing() {
    let connector = MockConnector::new();
    let core = redis(connector.clone());
    core.dial().await.unwrap();
    let mut listener = core.listen();

    let err = core
        .config(&settings(&[
            ("endpoint", "elsewhere:6379"),
            ("password", "hunter2"),
            ("connTimeout", "soon"),
        ]))
        .await
        .unwrap_err();

    assert_eq!(err.key(), "connTimeout");
    assert_eq!(err.value(), "soon");
    let current = core.settings().await;
    assert_eq!(current.endpoint(), "localhost:6379");
    assert_eq!(current.secret(), None);
    assert!(core.is_connected());
    assert_eq!(listener.try_event(), None);
}

#[tokio::test]
async fn unrecognized_keys_are_ignored() {
    let core = ServiceCore::builder(MockConnector::new(), EndpointSettings::new("amqp://a"))
        .build();

    let changed = core
        .config(&settings(&[("exchange", "events"), ("prefetch", "x")]))
        .await
        .unwrap();
    assert!(!changed);
}

#[tokio::test]
async fn options_apply_in_order_until_first_failure() {
    let connector = MockConnector::new().always_failing();
    let core = redis(connector.clone());

    let seen = Arc::new(AtomicUsize::new(0));
    let mut listeners = EventListeners::new();
    let counter = Arc::clone(&seen);
    listeners.add_fn(move |_: &ConnectionEvent| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let err = core
        .set_options([
            ServiceOption::dial_policy(DialPolicy::periodic(3, Duration::from_millis(1))),
            ServiceOption::config([("db", "zero")]),
            ServiceOption::event_listeners(listeners),
        ])
        .await
        .unwrap_err();

    let AdapterError::ConfigInvalid(config) = &err else {
        panic!("expected ConfigInvalid, got {err:?}");
    };
    assert_eq!(config.key(), "db");

    // the policy before the failure stuck, the listeners after it did not
    let err = core.dial().await.unwrap_err();
    assert!(matches!(err, AdapterError::DialExhausted { attempts: 4, .. }));
    assert_eq!(seen.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn options_all_applied() {
    let connector = MockConnector::new();
    let core = redis(connector.clone());

    core.set_options([
        ServiceOption::config([("endpoint", "cache:6379"), ("db", "1")]),
        ServiceOption::dial_policy(DialPolicy::exponential(3, Duration::from_millis(1))),
    ])
    .await
    .unwrap();

    core.dial().await.unwrap();
    assert!(connector.targets()[0].contains("cache:6379"));
}
