//! Proxies
//!
//! A proxy implements the same interface as its target and routes every
//! method call through a [`Spin`]: the configured interceptors, then the
//! spinner. Interfaces opt in with the [`interface!`](crate::interface)
//! macro, which generates the forwarding implementation for
//! [`Proxy<dyn Trait>`](Proxy).
//!
//! Two proxies are equal when they were made by the same factory, spin
//! with the same discipline and wrap the very same target allocation.

use std::any;
use std::fmt;
use std::sync::Arc;

use tracing::{error, trace};

use crate::error::{Result, SpinError};
use crate::interceptor::Interceptor;
use crate::invocation::{Arguments, Call, Invocation, Method, Value};
use crate::registry::Registry;
use crate::spinner::{Spinner, SpinnerKind};

/// Name of the [`StandardProxyFactory`]
pub const STANDARD_FACTORY: &str = "standard";

/// Anything that can sit behind a proxy
///
/// Implemented by every interface declared with
/// [`interface!`](crate::interface). Only proxies report a handler.
pub trait Target: Send + Sync + 'static {
    /// The proxy handler, if this object is a proxy
    fn spin_handler(&self) -> Option<&Handler> {
        None
    }
}

/// An interface that proxies can implement, typically `dyn Trait`
pub trait Interface: Target {
    /// Turn a proxy into an instance of the interface
    fn wrap(proxy: Proxy<Self>) -> Arc<Self>;
}

/// Identity of a target allocation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TargetId(usize);

impl TargetId {
    pub fn of<T: ?Sized>(target: &Arc<T>) -> Self {
        Self(Arc::as_ptr(target) as *const () as usize)
    }
}

/// Routing state of one proxy
#[derive(Debug)]
pub struct Handler {
    factory: &'static str,
    target: TargetId,
    spin: Spin,
}

impl Handler {
    pub fn new(factory: &'static str, target: TargetId, spin: Spin) -> Self {
        Self {
            factory,
            target,
            spin,
        }
    }

    /// Name of the factory that created the proxy
    pub fn factory(&self) -> &'static str {
        self.factory
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn kind(&self) -> SpinnerKind {
        self.spin.spinner().kind()
    }

    pub fn spin(&self) -> &Spin {
        &self.spin
    }

    /// Check whether both handlers proxy the same target the same way
    pub fn same_binding(&self, other: &Handler) -> bool {
        self.factory == other.factory && self.kind() == other.kind() && self.target == other.target
    }
}

/// Proxy over a target implementing interface `I`
pub struct Proxy<I: ?Sized> {
    target: Arc<I>,
    handler: Handler,
}

impl<I: Interface + ?Sized> Proxy<I> {
    pub fn target(&self) -> &Arc<I> {
        &self.target
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Route one call through the interceptors and the spinner
    ///
    /// Whatever the target returns is returned, and a panic in the target
    /// is resumed here. Panics if marshaling itself fails; use
    /// [`Proxy::try_invoke`] to get the error instead.
    pub fn invoke<R: Send + 'static>(
        &self,
        method: &'static Method,
        arguments: Vec<Value>,
        call: fn(&I, &mut Arguments) -> R,
    ) -> R {
        match self.try_invoke(method, arguments, call) {
            Ok(value) => value,
            Err(e) => {
                error!("marshaling {} failed: {}", method, e);
                panic!("marshaling {} failed: {}", method, e)
            }
        }
    }

    /// Like [`Proxy::invoke`], but reports marshaling failures
    ///
    /// A fire-and-forget call yields `()` without waiting for the target.
    pub fn try_invoke<R: Send + 'static>(
        &self,
        method: &'static Method,
        arguments: Vec<Value>,
        call: fn(&I, &mut Arguments) -> R,
    ) -> Result<R> {
        let target = Arc::clone(&self.target);
        let evaluate: Call = Box::new(move |values| {
            let mut arguments = Arguments::new(method, values);
            Box::new(call(&*target, &mut arguments)) as Value
        });

        let spin = &self.handler.spin;
        let invocation = Arc::new(
            Invocation::new(method, arguments, evaluate, Arc::clone(spin.spinner()))
                .with_target(self.handler.target)
                .with_interceptors(spin.interceptors().to_vec()),
        );
        trace!(
            "invocation {} of {} spinning {}",
            invocation.id(),
            method,
            self.handler.kind()
        );

        let value = invocation.start()?;
        value
            .downcast::<R>()
            .map(|value| *value)
            .map_err(|_| SpinError::ResultMismatch {
                method: method.to_string(),
                expected: any::type_name::<R>(),
            })
    }
}

impl<I: Interface + ?Sized> Target for Proxy<I> {
    fn spin_handler(&self) -> Option<&Handler> {
        Some(&self.handler)
    }
}

impl<I: ?Sized> PartialEq for Proxy<I> {
    fn eq(&self, other: &Self) -> bool {
        self.handler.same_binding(&other.handler)
    }
}

impl<I: ?Sized> Eq for Proxy<I> {}

impl<I: ?Sized> fmt::Debug for Proxy<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("factory", &self.handler.factory)
            .field("kind", &self.handler.kind())
            .field("target", &self.handler.target)
            .finish()
    }
}

/// Creates proxies
pub trait ProxyFactory: Send + Sync + fmt::Debug {
    /// Name recorded in every handler this factory creates
    fn name(&self) -> &'static str;

    fn create_handler(&self, target: TargetId, spin: Spin) -> Handler {
        Handler::new(self.name(), target, spin)
    }
}

impl dyn ProxyFactory {
    /// Wrap `target` in a proxy spinning with `spin`
    pub fn create_proxy<I: Interface + ?Sized>(&self, target: Arc<I>, spin: Spin) -> Arc<I> {
        let handler = self.create_handler(TargetId::of(&target), spin);
        trace!(
            "{} proxy created over {:?} spinning {}",
            self.name(),
            handler.target,
            handler.kind()
        );
        I::wrap(Proxy { target, handler })
    }

    /// Check whether `object` is a proxy created by this factory
    pub fn is_proxy<T: Target + ?Sized>(&self, object: &T) -> bool {
        object
            .spin_handler()
            .is_some_and(|handler| handler.factory() == self.name())
    }
}

/// The default proxy factory
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardProxyFactory;

impl ProxyFactory for StandardProxyFactory {
    fn name(&self) -> &'static str {
        STANDARD_FACTORY
    }
}

/// A complete marshaling recipe: factory, spinner and interceptors
///
/// ```no_run
/// use std::sync::Arc;
/// use eventloop::EventLoop;
/// use spin::{interface, OffSpinner, Spin};
///
/// interface! {
///     pub trait Service {
///         fn fetch(&self, key: String) -> String;
///     }
/// }
///
/// struct Slow;
///
/// impl spin::Target for Slow {}
///
/// impl Service for Slow {
///     fn fetch(&self, key: String) -> String {
///         key.to_uppercase()
///     }
/// }
///
/// let spin = Spin::new(Arc::new(OffSpinner::with_defaults(EventLoop::main().clone())));
/// let service: Arc<dyn Service> = spin.proxy(Arc::new(Slow) as Arc<dyn Service>);
/// assert_eq!(service.fetch("a".into()), "A");
/// ```
#[derive(Clone, Debug)]
pub struct Spin {
    factory: Arc<dyn ProxyFactory>,
    spinner: Arc<dyn Spinner>,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Spin {
    /// Spin with `spinner`, the standard factory and no interceptors
    pub fn new(spinner: Arc<dyn Spinner>) -> Self {
        Self {
            factory: Arc::new(StandardProxyFactory),
            spinner,
            interceptors: Vec::new(),
        }
    }

    /// The global registry's current off-marshaling
    pub fn off() -> Self {
        Registry::global().off_spin()
    }

    /// The global registry's current over-marshaling
    pub fn over() -> Self {
        Registry::global().over_spin()
    }

    pub fn with_factory(mut self, factory: Arc<dyn ProxyFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_spinner(mut self, spinner: Arc<dyn Spinner>) -> Self {
        self.spinner = spinner;
        self
    }

    /// Append an interceptor to the chain
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Replace the interceptor chain
    pub fn with_interceptors(mut self, interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        self.interceptors = interceptors;
        self
    }

    pub fn factory(&self) -> &Arc<dyn ProxyFactory> {
        &self.factory
    }

    pub fn spinner(&self) -> &Arc<dyn Spinner> {
        &self.spinner
    }

    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    /// Wrap `target` in a proxy
    pub fn proxy<I: Interface + ?Sized>(&self, target: Arc<I>) -> Arc<I> {
        self.factory.create_proxy(target, self.clone())
    }
}

/// Check whether `object` is a proxy made by any factory
pub fn is_proxy<T: Target + ?Sized>(object: &T) -> bool {
    object.spin_handler().is_some()
}

/// Compare two objects the way proxies compare
///
/// Two proxies are equal when they share factory, spinner kind and target.
/// A proxy never equals a plain object. Plain objects are equal only to
/// themselves.
pub fn equals<T: Target + ?Sized>(a: &T, b: &T) -> bool {
    match (a.spin_handler(), b.spin_handler()) {
        (Some(a), Some(b)) => a.same_binding(b),
        (None, None) => std::ptr::addr_eq(a, b),
        _ => false,
    }
}
