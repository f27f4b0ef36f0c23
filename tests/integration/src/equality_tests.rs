//! Proxy Equality Tests
//!
//! Proxies compare by binding, not by allocation:
//! - Same target, same discipline, same factory: equal
//! - Different target or discipline: not equal
//! - A proxy never equals a plain object

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::*;
use spin::{equals, is_proxy, Registry, Target};

fn setup() -> (TestLoop, Registry) {
    init_logging();
    let test_loop = TestLoop::spawn("equality");
    let registry = Registry::new(test_loop.event_loop.clone());
    (test_loop, registry)
}

#[test]
fn test_independent_proxies_of_same_target_are_equal() {
    let (_test_loop, registry) = setup();
    let bean: Arc<dyn Bean> = SlowBean::new("abc", Duration::ZERO);

    let first = registry.off(bean.clone());
    let second = registry.off(bean.clone());

    assert!(!Arc::ptr_eq(&first, &second));
    assert!(equals(&*first, &*second));
    assert!(equals(&*second, &*first));
    assert!(equals(&*first, &*first));
}

#[test]
fn test_different_targets_are_not_equal() {
    let (_test_loop, registry) = setup();
    let a: Arc<dyn Bean> = SlowBean::new("abc", Duration::ZERO);
    let b: Arc<dyn Bean> = SlowBean::new("abc", Duration::ZERO);

    assert!(!equals(&*registry.off(a), &*registry.off(b)));
}

#[test]
fn test_off_and_over_are_not_equal() {
    let (_test_loop, registry) = setup();
    let bean: Arc<dyn Bean> = SlowBean::new("abc", Duration::ZERO);

    assert!(!equals(&*registry.off(bean.clone()), &*registry.over(bean.clone())));
}

#[test]
fn test_proxy_never_equals_plain_object() {
    let (_test_loop, registry) = setup();
    let bean: Arc<dyn Bean> = SlowBean::new("abc", Duration::ZERO);
    let proxy = registry.off(bean.clone());

    assert!(is_proxy(&*proxy));
    assert!(!is_proxy(&*bean));
    assert!(!equals(&*proxy, &*bean));
    assert!(!equals(&*bean, &*proxy));
    assert!(equals(&*bean, &*bean));
}

#[test]
fn test_handlers_identify_binding() {
    let (_test_loop, registry) = setup();
    let bean: Arc<dyn Bean> = SlowBean::new("abc", Duration::ZERO);

    let bindings: HashSet<_> = (0..4)
        .map(|_| {
            let proxy = registry.off(bean.clone());
            let handler = proxy.spin_handler().unwrap();
            (handler.factory(), handler.kind(), handler.target())
        })
        .collect();

    assert_eq!(bindings.len(), 1);
}
