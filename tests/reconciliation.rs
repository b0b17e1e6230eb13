//! Reconciliation tests
//!
//! Drives a session through manifest changes with a recording transport and
//! checks which watches get opened or closed and what the state looks like.

mod common;

use common::{RecordingTransport, ScriptedFetcher, manifest, object, release};
use relwatch::error::TransportError;
use relwatch::models::{ReleaseRef, ResourceKind};
use relwatch::services::AppSession;
use relwatch::view::AppView;
use relwatch::watcher::{EntryState, TransportEvent, WatchConnectionManager};
use serde_json::json;
use std::sync::Arc;

fn session(transport: &RecordingTransport) -> AppSession {
    AppSession::new(
        ReleaseRef::new("shop", "default"),
        Arc::new(ScriptedFetcher::new()),
        Arc::new(transport.clone()),
    )
}

#[test]
fn test_unchanged_manifest_opens_and_closes_nothing() {
    let transport = RecordingTransport::new();
    let mut session = session(&transport);
    let text = manifest(&[("Deployment", "foo"), ("Service", "bar")]);

    session
        .on_manifest_received(release("shop", "default", &text))
        .unwrap();
    assert_eq!(transport.open_count(), 2);

    let outcome = session
        .on_manifest_received(release("shop", "default", &text))
        .unwrap();
    assert!(outcome.is_noop());
    assert_eq!(transport.open_count(), 2);
    assert!(transport.closed_keys().is_empty());
}

#[test]
fn test_kinds_load_independently() {
    let transport = RecordingTransport::new();
    let mut session = session(&transport);
    let text = manifest(&[("Deployment", "foo"), ("Service", "bar")]);
    session
        .on_manifest_received(release("shop", "default", &text))
        .unwrap();

    transport.apply("Deployment", "foo", object("Deployment", "foo"));
    assert_eq!(session.drain_events(), 1);

    let view = session.view();
    let resources = &view.as_ready().unwrap().resources;
    assert!(!resources.deployments.loading);
    assert_eq!(resources.deployments.items.len(), 1);
    assert!(resources.services.loading);
    assert!(resources.services.items.is_empty());
    assert!(view.is_loading());
}

#[test]
fn test_added_resource_opens_one_watch_and_keeps_loaded_state() {
    let transport = RecordingTransport::new();
    let mut session = session(&transport);
    session
        .on_manifest_received(release("shop", "default", &manifest(&[("Deployment", "foo")])))
        .unwrap();
    transport.apply("Deployment", "foo", object("Deployment", "foo"));
    session.drain_events();

    let outcome = session
        .on_manifest_received(release(
            "shop",
            "default",
            &manifest(&[("Deployment", "foo"), ("Deployment", "baz")]),
        ))
        .unwrap();

    assert_eq!(outcome.opened, vec!["Deployment/baz"]);
    assert!(outcome.closed.is_empty());
    assert_eq!(outcome.retained, vec!["Deployment/foo"]);
    assert_eq!(transport.opened_keys(), vec!["Deployment/foo", "Deployment/baz"]);

    let state = session.state();
    assert_eq!(
        state.get("Deployment/foo").unwrap().state,
        EntryState::Loaded(object("Deployment", "foo"))
    );
    assert_eq!(state.get("Deployment/baz").unwrap().state, EntryState::Pending);
}

#[test]
fn test_removed_resource_closes_its_watch() {
    let transport = RecordingTransport::new();
    let mut session = session(&transport);
    session
        .on_manifest_received(release(
            "shop",
            "default",
            &manifest(&[("Deployment", "foo"), ("Secret", "creds")]),
        ))
        .unwrap();

    let outcome = session
        .on_manifest_received(release("shop", "default", &manifest(&[("Deployment", "foo")])))
        .unwrap();

    assert_eq!(outcome.closed, vec!["Secret/creds"]);
    assert_eq!(transport.closed_keys(), vec!["Secret/creds"]);
    assert!(session.state().get("Secret/creds").is_none());
    assert_eq!(session.watched_keys(), vec!["Deployment/foo"]);
}

#[test]
fn test_event_from_closed_watch_is_dropped() {
    let transport = RecordingTransport::new();
    let mut session = session(&transport);
    session
        .on_manifest_received(release(
            "shop",
            "default",
            &manifest(&[("Deployment", "foo"), ("Service", "bar")]),
        ))
        .unwrap();
    let old_sink = transport.sink("Service/bar");

    session
        .on_manifest_received(release("shop", "default", &manifest(&[("Deployment", "foo")])))
        .unwrap();
    assert!(old_sink.send(TransportEvent::Applied(object("Service", "bar"))));

    assert_eq!(session.drain_events(), 0);
    assert!(session.state().get("Service/bar").is_none());
}

#[test]
fn test_reopened_key_ignores_the_old_handle() {
    let transport = RecordingTransport::new();
    let mut session = session(&transport);
    let text = manifest(&[("Service", "bar")]);
    session
        .on_manifest_received(release("shop", "default", &text))
        .unwrap();
    let old_sink = transport.sink("Service/bar");

    // Remove then re-add: the key is watched again under a new handle
    session
        .on_manifest_received(release("shop", "default", &manifest(&[("Secret", "x")])))
        .unwrap();
    session
        .on_manifest_received(release("shop", "default", &text))
        .unwrap();
    assert_eq!(transport.opened_keys().len(), 3);

    old_sink.send(TransportEvent::Applied(json!({
        "kind": "Service",
        "metadata": {"name": "bar"},
        "spec": {"type": "stale"}
    })));
    assert_eq!(session.drain_events(), 0);
    assert_eq!(
        session.state().get("Service/bar").unwrap().state,
        EntryState::Pending
    );

    transport.apply("Service", "bar", object("Service", "bar"));
    assert_eq!(session.drain_events(), 1);
}

#[test]
fn test_last_write_wins_across_interleaved_watches() {
    let transport = RecordingTransport::new();
    let mut session = session(&transport);
    session
        .on_manifest_received(release(
            "shop",
            "default",
            &manifest(&[("Service", "a"), ("Service", "b")]),
        ))
        .unwrap();

    let version = |name: &str, v: i64| {
        json!({"kind": "Service", "metadata": {"name": name, "resourceVersion": v.to_string()}})
    };
    transport.apply("Service", "a", version("a", 1));
    transport.apply("Service", "b", version("b", 1));
    transport.apply("Service", "a", version("a", 2));
    transport.apply("Service", "b", version("b", 2));
    transport.apply("Service", "a", version("a", 3));
    assert_eq!(session.drain_events(), 5);

    assert_eq!(
        session.state().get("Service/a").unwrap().state,
        EntryState::Loaded(version("a", 3))
    );
    assert_eq!(
        session.state().get("Service/b").unwrap().state,
        EntryState::Loaded(version("b", 2))
    );
}

#[test]
fn test_transport_error_only_affects_its_resource() {
    let transport = RecordingTransport::new();
    let mut session = session(&transport);
    session
        .on_manifest_received(release(
            "shop",
            "default",
            &manifest(&[("Ingress", "web"), ("Ingress", "admin"), ("Service", "web")]),
        ))
        .unwrap();

    transport.apply("Ingress", "admin", object("Ingress", "admin"));
    transport.fail("Ingress/web", TransportError::Watch("forbidden".to_string()));
    session.drain_events();

    let view = session.view();
    let resources = &view.as_ready().unwrap().resources;
    assert_eq!(
        resources.ingresses.error,
        Some(TransportError::Watch("forbidden".to_string()))
    );
    assert_eq!(resources.ingresses.items.len(), 1);
    assert!(!resources.ingresses.loading);
    assert!(resources.services.error.is_none());
    assert!(transport.closed_keys().is_empty());
}

#[test]
fn test_exhausted_watch_is_reopened_on_next_snapshot() {
    let transport = RecordingTransport::new();
    let mut session = session(&transport);
    session
        .on_manifest_received(release("shop", "default", &manifest(&[("Deployment", "foo")])))
        .unwrap();

    transport.fail("Deployment/foo", TransportError::Exhausted(5));
    transport.stop("Deployment/foo");
    assert_eq!(session.drain_events(), 1);
    assert!(session.watched_keys().is_empty());

    let outcome = session
        .on_manifest_received(release(
            "shop",
            "default",
            &manifest(&[("Deployment", "foo"), ("Service", "bar")]),
        ))
        .unwrap();

    assert_eq!(outcome.opened, vec!["Deployment/foo", "Service/bar"]);
    assert!(outcome.retained.is_empty());
    assert_eq!(
        session.state().get("Deployment/foo").unwrap().state,
        EntryState::Pending
    );
    assert_eq!(session.watched_keys(), vec!["Deployment/foo", "Service/bar"]);
}

#[test]
fn test_unchanged_manifest_reopens_stopped_watch() {
    let transport = RecordingTransport::new();
    let mut session = session(&transport);
    let text = manifest(&[("Secret", "creds"), ("Service", "bar")]);
    session
        .on_manifest_received(release("shop", "default", &text))
        .unwrap();
    transport.apply("Service", "bar", object("Service", "bar"));
    transport.apply("Secret", "creds", object("Secret", "creds"));
    transport.stop("Secret/creds");
    session.drain_events();

    let outcome = session
        .on_manifest_received(release("shop", "default", &text))
        .unwrap();

    assert_eq!(outcome.opened, vec!["Secret/creds"]);
    assert_eq!(outcome.retained, vec!["Service/bar"]);
    assert!(outcome.closed.is_empty());
    assert_eq!(
        session.state().get("Service/bar").unwrap().state,
        EntryState::Loaded(object("Service", "bar"))
    );

    // Everything is covered again, so the next identical manifest is a no-op
    let outcome = session
        .on_manifest_received(release("shop", "default", &text))
        .unwrap();
    assert!(outcome.is_noop());
}

#[test]
fn test_refused_open_marks_entry_errored() {
    let transport = RecordingTransport::new();
    transport.refuse("Secret/creds");
    let mut session = session(&transport);

    let outcome = session
        .on_manifest_received(release(
            "shop",
            "default",
            &manifest(&[("Secret", "creds"), ("Deployment", "foo")]),
        ))
        .unwrap();

    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(session.watched_keys(), vec!["Deployment/foo"]);
    assert!(matches!(
        session.state().get("Secret/creds").unwrap().state,
        EntryState::Errored(TransportError::Open(_))
    ));
}

#[test]
fn test_static_resources_are_never_watched() {
    let transport = RecordingTransport::new();
    let mut session = session(&transport);
    session
        .on_manifest_received(release(
            "shop",
            "default",
            &manifest(&[("ConfigMap", "cfg"), ("Service", "web"), ("ServiceAccount", "sa")]),
        ))
        .unwrap();

    assert_eq!(transport.opened_keys(), vec!["Service/web"]);
    let statics: Vec<&String> = session.state().statics().keys().collect();
    assert_eq!(statics, vec!["ConfigMap/cfg", "ServiceAccount/sa"]);
}

#[test]
fn test_watch_targets_carry_release_namespace() {
    let transport = RecordingTransport::new();
    let mut session = session(&transport);
    session
        .on_manifest_received(release("shop", "default", &manifest(&[("Deployment", "foo")])))
        .unwrap();

    let target = transport.target("Deployment/foo");
    assert_eq!(target.kind, ResourceKind::Deployment);
    assert_eq!(target.api_version, "apps/v1");
    assert_eq!(target.namespace, "default");
    assert_eq!(target.name, "foo");
}

#[test]
fn test_dropping_manager_closes_connections() {
    let transport = RecordingTransport::new();
    let (mut manager, _rx) = WatchConnectionManager::new(Arc::new(transport.clone()));
    let snapshot = relwatch::parse_manifest(
        &manifest(&[("Service", "a"), ("Secret", "b")]),
        &ReleaseRef::new("shop", "default"),
    )
    .unwrap();
    manager.reconcile(&relwatch::select_targets(&snapshot).watchable);
    drop(manager);

    let mut closed = transport.closed_keys();
    closed.sort();
    assert_eq!(closed, vec!["Secret/b", "Service/a"]);
}

#[test]
fn test_view_stays_loading_before_any_release() {
    let transport = RecordingTransport::new();
    let session = session(&transport);
    assert_eq!(session.view(), AppView::Loading);
    assert_eq!(transport.open_count(), 0);
}
