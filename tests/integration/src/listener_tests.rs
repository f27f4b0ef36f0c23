//! Listener Auto-wrap Tests
//!
//! An off-proxy configured with the listener interceptor replaces listeners
//! passed to `add*listener` / `remove*listener` with over-proxies, so that
//! callbacks fired from worker threads arrive on the loop thread.

mod common;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::*;
use spin::{equals, is_proxy, ListenerOver, Registry, SpinnerKind, Target};

fn wrapping_registry(test_loop: &TestLoop) -> Registry {
    let registry = Registry::new(test_loop.event_loop.clone());
    let over = registry.over_spin();
    registry.set_off_interceptors(vec![Arc::new(ListenerOver::with_spin(over))]);
    registry
}

#[test]
fn test_added_listener_is_wrapped() {
    init_logging();

    let test_loop = TestLoop::spawn("listener-wrap");
    let registry = wrapping_registry(&test_loop);
    let bean = SlowBean::new("abc", Duration::from_millis(10));
    let proxy = registry.off(bean.clone() as Arc<dyn Bean>);
    let listener = RecordingListener::new(&test_loop.event_loop);
    let plain: Arc<dyn ChangeListener> = listener.clone();

    let added = plain.clone();
    test_loop.run(move || proxy.add_change_listener(added));

    let stored = bean.listeners();
    assert_eq!(stored.len(), 1);
    assert!(is_proxy(&*stored[0]));
    assert!(!equals(&*stored[0], &*plain));
    assert_eq!(stored[0].spin_handler().unwrap().kind(), SpinnerKind::Over);

    // Fired from this (non-loop) thread, delivered on the loop thread
    bean.set_value("changed".into());
    bean.fire();
    assert_eq!(listener.seen(), vec![("changed".to_string(), true)]);
}

#[test]
fn test_callbacks_from_worker_threads_reach_loop() {
    init_logging();

    let test_loop = TestLoop::spawn("listener-worker");
    let registry = wrapping_registry(&test_loop);
    let bean = SlowBean::new("abc", Duration::ZERO);
    let proxy = registry.off(bean.clone() as Arc<dyn Bean>);
    let listener = RecordingListener::new(&test_loop.event_loop);

    let added: Arc<dyn ChangeListener> = listener.clone();
    test_loop.run(move || proxy.add_change_listener(added));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let bean = bean.clone();
            thread::spawn(move || bean.fire())
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let seen = listener.seen();
    assert_eq!(seen.len(), 4);
    assert!(seen.iter().all(|(_, on_loop)| *on_loop));
}

#[test]
fn test_removal_finds_wrapped_listener() {
    init_logging();

    let test_loop = TestLoop::spawn("listener-remove");
    let registry = wrapping_registry(&test_loop);
    let bean = SlowBean::new("abc", Duration::ZERO);
    let proxy = registry.off(bean.clone() as Arc<dyn Bean>);
    let listener: Arc<dyn ChangeListener> = RecordingListener::new(&test_loop.event_loop);

    let count = test_loop.run(move || {
        proxy.add_change_listener(listener.clone());
        let added = proxy.listener_count();
        proxy.remove_change_listener(listener);
        (added, proxy.listener_count())
    });

    assert_eq!(count, (1, 0));
}

#[test]
fn test_other_methods_untouched() {
    init_logging();

    let test_loop = TestLoop::spawn("listener-other");
    let registry = wrapping_registry(&test_loop);
    let bean = SlowBean::new("abc", Duration::ZERO);
    let proxy = registry.off(bean.clone() as Arc<dyn Bean>);

    let value = test_loop.run(move || {
        proxy.set_value("plain".into());
        proxy.value()
    });

    assert_eq!(value, "plain");
    assert_eq!(bean.calls(), 2);
}

#[test]
fn test_interceptor_refuses_over_proxies() {
    init_logging();

    let test_loop = TestLoop::spawn("listener-refuse");
    let registry = Registry::new(test_loop.event_loop.clone());
    let spin = registry
        .over_spin()
        .with_interceptor(Arc::new(ListenerOver::with_spin(registry.over_spin())));
    let bean = SlowBean::new("abc", Duration::ZERO);
    let proxy = spin.proxy(bean.clone() as Arc<dyn Bean>);
    let listener: Arc<dyn ChangeListener> = RecordingListener::new(&test_loop.event_loop);

    let caught = panic::catch_unwind(AssertUnwindSafe(|| proxy.add_change_listener(listener)));
    let message = panic_message(&*caught.expect_err("over proxy should be refused"));

    assert!(message.contains("invalid argument"), "unexpected panic: {}", message);
    assert_eq!(bean.calls(), 0);
}
