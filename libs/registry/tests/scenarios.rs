//! Multi-module registry scenarios (concrete examples from spec.md §8).

use conn_pushqueue::{ContentType, PushOutcome, PushQueue, PushTransport, SubmitOutcome};
use conn_registry::session::{AvcCore, CoreOpenResult};
use conn_registry::timer::DebounceTimer;
use conn_registry::Registry;
use conn_types::{ResourceMode, Side, Value};
use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

fn path(s: &str) -> conn_types::AssetDataPath {
    conn_types::AssetDataPath::from_str(s).unwrap()
}

struct ImmediateTransport {
    next_id: u64,
}

impl Default for ImmediateTransport {
    fn default() -> Self {
        Self { next_id: 1 }
    }
}

impl PushTransport for ImmediateTransport {
    fn submit(&mut self, _payload: &[u8], _content_type: ContentType) -> SubmitOutcome {
        let id = self.next_id;
        self.next_id += 1;
        SubmitOutcome::Submitted(id)
    }
}

struct NoopCore;
impl AvcCore for NoopCore {
    fn open_session(&mut self) -> CoreOpenResult {
        CoreOpenResult::Opened
    }
    fn close_session(&mut self) {}
}

#[derive(Default)]
struct NoopTimer;
impl DebounceTimer for NoopTimer {
    fn schedule(&mut self, _delay_secs: u64) {}
    fn cancel(&mut self) {}
}

/// Scenario: an app creates a resource, sets a value from the client side,
/// pushes it, and the push queue's ACK fires the caller's callback with the
/// same context it was handed (spec §8 scenario 2, minus the recorder half).
#[test]
fn create_set_push_ack_roundtrip() {
    let mut registry: Registry<i32> = Registry::new();
    let p = path("/tempSensor/value");
    registry.create_resource(p.clone(), ResourceMode::Variable).unwrap();
    registry.set_int(&p, 21, Side::Client).unwrap();

    let mut queue = PushQueue::new();
    let mut transport = ImmediateTransport::default();
    let result = Rc::new(RefCell::new(None));
    let result_clone = result.clone();
    registry
        .push(&p, &mut queue, &mut transport, move |outcome, ctx| {
            *result_clone.borrow_mut() = Some((outcome, ctx));
        }, 7)
        .unwrap();
    assert!(result.borrow().is_none());
    queue.ack(&mut transport, 1, PushOutcome::Success);
    assert_eq!(*result.borrow(), Some((PushOutcome::Success, 7)));
}

/// Scenario: a server GET on an ancestor path with mixed-type leaves
/// enumerates all readable children (spec §8 scenario 5).
#[test]
fn server_get_on_ancestor_returns_all_readable_leaf_types() {
    let mut registry: Registry<()> = Registry::new();
    let leaves: Vec<(&str, Value)> = vec![
        ("value1", Value::Int(5)),
        ("value2", Value::Float(3.14)),
        ("value3", Value::String("helloWorld".to_string())),
        ("value4", Value::Bool(false)),
    ];
    for (name, value) in &leaves {
        let p = path(&format!("/asset/{name}"));
        registry.create_resource(p.clone(), ResourceMode::Variable).unwrap();
        registry.set_value(&p, value.clone(), Side::Client).unwrap();
    }

    let children = registry.enumerate_subtree(&path("/asset"), Side::Server);
    assert_eq!(children.len(), 4);
    let found_value3 = children
        .iter()
        .find(|(p, _)| p.as_str() == "/asset/value3")
        .map(|(_, v)| v.clone());
    assert_eq!(found_value3, Some(Value::String("helloWorld".to_string())));
}

/// Scenario: writing to an unknown, non-ancestor path is rejected before it
/// ever reaches the wire (spec §8 scenario 6, registry half of the
/// dispatcher's `4.00 Bad Request` mapping).
#[test]
fn write_to_unknown_non_ancestor_path_fails() {
    let mut registry: Registry<()> = Registry::new();
    let err = registry
        .set_int(&path("/asset/missing"), 1, Side::Server)
        .unwrap_err();
    assert_eq!(err.kind, conn_types::Kind::NotFound);
}

/// Scenario: a session requested by two independent subsystems is only
/// closed once both release it (spec §8 invariant, §4.F, §9).
#[test]
fn session_reference_counts_across_two_requesters() {
    let mut registry: Registry<()> = Registry::new();
    let mut core = NoopCore;
    let first = registry.request_session(&mut core);
    let second = registry.request_session(&mut core);
    assert_eq!(registry.session_outstanding(), 2);
    registry.release_session(&mut core, first).unwrap();
    assert_eq!(registry.session_outstanding(), 1);
    registry.release_session(&mut core, second).unwrap();
    assert_eq!(registry.session_outstanding(), 0);
}

/// Scenario: creating two instances in quick succession coalesces into one
/// registration-update line, rendered only once the debounce timer fires
/// (spec §4.B, §6).
#[test]
fn rapid_instance_creation_coalesces_into_one_registration_update() {
    let mut registry: Registry<()> = Registry::new();
    let asset = registry.objects.create_asset("myApp", 1, None, vec![]).unwrap();
    let mut timer = NoopTimer::default();
    registry
        .create_instance_with_registration_update(asset, Some(0), &mut timer)
        .unwrap();
    registry
        .create_instance_with_registration_update(asset, Some(1), &mut timer)
        .unwrap();

    let update = registry.on_registration_update_timer_fired().unwrap();
    assert!(update.contains("</le_myApp/1/0>"));
    assert!(update.contains("</le_myApp/1/1>"));
    // Timer already consumed; a second fire without new activity is a no-op.
    assert!(registry.on_registration_update_timer_fired().is_none());
}
