//! Transparent thread marshaling around a cooperative event loop
//!
//! Code running on the event loop thread must not block, and objects owned
//! by the loop must only be touched from it. This crate wraps objects in
//! proxies that enforce both rules without changing their interface:
//!
//! - [`off`]: calls made on the loop thread are evaluated on a worker
//!   thread while the loop keeps serving events; the caller still receives
//!   the result synchronously
//! - [`over`]: calls made on any other thread are evaluated on the loop
//!   thread, waiting for it or fire-and-forget
//!
//! ```text
//!   caller ──► Proxy ──► Interceptor* ──► Spinner ──► target
//!                │                           │
//!                └── Invocation ─────────────┘
//!                                    OffSpinner: Starter + Dispatcher
//!                                    OverSpinner: invoke_later / _and_wait
//! ```
//!
//! Failures of the target are never rewritten: a returned `Err` is just
//! another value and a panic is resumed on the calling thread. Marshaling
//! failures are [`SpinError`]s.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! spin::interface! {
//!     pub trait Service {
//!         fn lookup(&self, key: String) -> Option<String>;
//!     }
//! }
//!
//! struct Database;
//!
//! impl spin::Target for Database {}
//!
//! impl Service for Database {
//!     fn lookup(&self, key: String) -> Option<String> {
//!         // slow I/O
//!         Some(key)
//!     }
//! }
//!
//! let service: Arc<dyn Service> = spin::off(Arc::new(Database) as Arc<dyn Service>);
//! eventloop::EventLoop::main()
//!     .invoke_later(move || {
//!         // Runs on a worker; the loop keeps pumping meanwhile
//!         let _ = service.lookup("answer".into());
//!     })
//!     .unwrap();
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
mod interceptor;
mod invocation;
mod macros;
mod proxy;
mod registry;
pub mod spinner;
pub mod starter;

use std::sync::Arc;

pub use config::SpinConfig;
pub use dispatcher::{
    ConcealedDialogDispatcherFactory, Dispatcher, DispatcherFactory, QueueDispatcherFactory,
    RevealedDialogDispatcherFactory,
};
pub use error::{Result, SpinError};
pub use interceptor::{rewrap, Interceptor, ListenerOver, PassThrough, Proxiable};
pub use invocation::{Arguments, Call, Invocation, Method, Param, ParamKind, Returns, Rewrap, Value};
pub use proxy::{
    equals, is_proxy, Handler, Interface, Proxy, ProxyFactory, Spin, StandardProxyFactory,
    Target, TargetId, STANDARD_FACTORY,
};
pub use registry::Registry;
pub use spinner::{OffSpinner, OverSpinner, Spinner, SpinnerKind, Spun};
pub use starter::{RuntimeStarter, Starter, ThreadStarter};

/// Wrap `target` with the global registry's off-marshaling
pub fn off<I: Interface + ?Sized>(target: Arc<I>) -> Arc<I> {
    Registry::global().off(target)
}

/// Wrap `target` with the global registry's over-marshaling
pub fn over<I: Interface + ?Sized>(target: Arc<I>) -> Arc<I> {
    Registry::global().over(target)
}
