//! Dispatcher Strategy Tests
//!
//! Off-marshaled calls pumped by modal dialogs instead of the plain queue:
//! - Concealed dialogs are pooled, off-screen and reused across calls
//! - Revealed dialogs need an active window to own them

mod common;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::*;
use eventloop::Rect;
use spin::{
    ConcealedDialogDispatcherFactory, DispatcherFactory, OffSpinner,
    RevealedDialogDispatcherFactory, Spin, ThreadStarter,
};

fn off_with(
    test_loop: &TestLoop,
    factory: Arc<dyn DispatcherFactory>,
    bean: &Arc<SlowBean>,
) -> Arc<dyn Bean> {
    let spinner = OffSpinner::new(
        test_loop.event_loop.clone(),
        Arc::new(ThreadStarter::new()),
        factory,
    );
    Spin::new(Arc::new(spinner)).proxy(bean.clone() as Arc<dyn Bean>)
}

#[test]
fn test_concealed_dialog_pumps_and_is_reused() {
    init_logging();

    let test_loop = TestLoop::spawn("concealed");
    let factory = ConcealedDialogDispatcherFactory::new();
    let bean = SlowBean::new("abc", Duration::from_millis(50));
    let proxy = off_with(&test_loop, Arc::new(factory.clone()), &bean);
    let event_loop = test_loop.event_loop.clone();

    let modal_depths = test_loop.run(move || {
        let mut depths = Vec::new();
        for _ in 0..3 {
            let observed = Arc::new(AtomicUsize::new(usize::MAX));
            let slot = observed.clone();
            let observer = event_loop.clone();
            event_loop
                .invoke_later(move || slot.store(observer.modal_depth(), Ordering::SeqCst))
                .unwrap();

            assert_eq!(proxy.value(), "abc");
            depths.push(observed.load(Ordering::SeqCst));
        }
        depths
    });

    assert_eq!(modal_depths, vec![1, 1, 1]);
    assert_eq!(factory.created(), 1);
    assert_eq!(factory.pooled(), 1);
    assert_eq!(test_loop.event_loop.modal_depth(), 0);
}

#[test]
fn test_nested_concealed_calls_take_separate_dialogs() {
    init_logging();

    let test_loop = TestLoop::spawn("concealed-nested");
    let factory = ConcealedDialogDispatcherFactory::new();
    let outer_bean = SlowBean::new("outer", Duration::from_millis(200));
    let inner_bean = SlowBean::new("inner", Duration::from_millis(20));
    let outer = off_with(&test_loop, Arc::new(factory.clone()), &outer_bean);
    let inner = off_with(&test_loop, Arc::new(factory.clone()), &inner_bean);
    let event_loop = test_loop.event_loop.clone();

    let inner_modal = test_loop.run(move || {
        let observed = Arc::new(AtomicUsize::new(0));
        let slot = observed.clone();
        let observer = event_loop.clone();
        event_loop
            .invoke_later(move || {
                let nested = observer.clone();
                let depth_slot = slot.clone();
                observer
                    .invoke_later(move || depth_slot.store(nested.modal_depth(), Ordering::SeqCst))
                    .unwrap();
                inner.value();
            })
            .unwrap();

        outer.value();
        observed.load(Ordering::SeqCst)
    });

    assert_eq!(inner_modal, 2);
    assert_eq!(factory.created(), 2);
    assert_eq!(factory.pooled(), 2);
}

#[test]
fn test_revealed_without_active_window_fails() {
    init_logging();

    let test_loop = TestLoop::spawn("revealed-none");
    let bean = SlowBean::new("abc", Duration::ZERO);
    let proxy = off_with(&test_loop, Arc::new(RevealedDialogDispatcherFactory), &bean);

    let message = test_loop.run(move || {
        let caught = panic::catch_unwind(AssertUnwindSafe(|| proxy.value()));
        caught.err().map(|payload| panic_message(&*payload))
    });

    let message = message.expect("call should fail without an owner window");
    assert!(message.contains("illegal state"), "unexpected panic: {}", message);
    assert_eq!(bean.calls(), 0);
}

#[test]
fn test_revealed_dialog_over_active_window() {
    init_logging();

    let test_loop = TestLoop::spawn("revealed");
    test_loop
        .event_loop
        .open_frame("main", Rect::new(0, 0, 800, 600));
    let bean = SlowBean::new("abc", Duration::from_millis(50));
    let proxy = off_with(&test_loop, Arc::new(RevealedDialogDispatcherFactory), &bean);
    let event_loop = test_loop.event_loop.clone();

    let (value, modal) = test_loop.run(move || {
        let observed = Arc::new(AtomicUsize::new(0));
        let slot = observed.clone();
        let observer = event_loop.clone();
        event_loop
            .invoke_later(move || slot.store(observer.modal_depth(), Ordering::SeqCst))
            .unwrap();

        let value = proxy.value();
        (value, observed.load(Ordering::SeqCst))
    });

    assert_eq!(value, "abc");
    assert_eq!(modal, 1);
    assert_eq!(test_loop.event_loop.modal_depth(), 0);
}
