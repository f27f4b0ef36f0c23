//! Interceptors
//!
//! Interceptors run, in registration order, between a proxy creating an
//! [`Invocation`] and its spinner evaluating it. Each one may inspect or
//! rewrite the arguments and must proceed by calling
//! [`Invocation::start`].

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::{Result, SpinError};
use crate::invocation::{Invocation, Method, ParamKind, Value};
use crate::proxy::{Interface, Spin};
use crate::spinner::SpinnerKind;

/// Hook around invocations
pub trait Interceptor: Send + Sync + fmt::Debug {
    /// Handle `invocation`; the default proceeds unchanged
    fn intercept(&self, invocation: &Arc<Invocation>) -> Result<Value> {
        invocation.start()
    }
}

/// Proceeds without touching the invocation
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl Interceptor for PassThrough {}

/// Wraps listeners registered through off-marshaled calls in over-proxies
///
/// A service moved off the loop calls back its listeners from a worker
/// thread. For methods named `add*listener` or `remove*listener`, every
/// parameter declared as a listener is replaced with a proxy that spins
/// the callbacks back onto the loop. Because proxies over the same target
/// compare equal, removing a listener finds the wrapper added earlier.
#[derive(Debug, Default, Clone)]
pub struct ListenerOver {
    /// Over-marshaling to wrap with; the registry default if unset
    spin: Option<Spin>,
}

impl ListenerOver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap with a fixed over-marshaling instead of the registry default
    pub fn with_spin(spin: Spin) -> Self {
        Self { spin: Some(spin) }
    }

    /// Check whether `method` registers or unregisters a listener
    pub fn is_listener_registration(method: &Method) -> bool {
        let name = method.name.to_ascii_lowercase();
        (name.starts_with("add") || name.starts_with("remove")) && name.ends_with("listener")
    }
}

impl Interceptor for ListenerOver {
    fn intercept(&self, invocation: &Arc<Invocation>) -> Result<Value> {
        if invocation.spinner_kind() != SpinnerKind::Off {
            return Err(SpinError::InvalidArgument(format!(
                "listener wrapping only applies to off-marshaled calls, {} is spun {}",
                invocation.method(),
                invocation.spinner_kind()
            )));
        }

        let method = invocation.method();
        if Self::is_listener_registration(method) {
            let spin = self.spin.clone().unwrap_or_else(Spin::over);
            let mut arguments = invocation.arguments();
            for (param, argument) in method.params.iter().zip(arguments.iter_mut()) {
                if let ParamKind::Listener(rewrap) = param.kind {
                    let listener = std::mem::replace(argument, Box::new(()));
                    *argument = rewrap(listener, &spin);
                    trace!("wrapped listener '{}' of {}", param.name, method);
                }
            }
        }

        invocation.start()
    }
}

/// Arguments that can be replaced by a proxy of themselves
pub trait Proxiable: Sized {
    fn proxied(self, spin: &Spin) -> Self;
}

impl<I: Interface + ?Sized> Proxiable for Arc<I> {
    fn proxied(self, spin: &Spin) -> Self {
        spin.proxy(self)
    }
}

/// Replace a type-erased `A` with a proxy of it
///
/// Values of any other type are returned untouched.
pub fn rewrap<A: Proxiable + Send + 'static>(value: Value, spin: &Spin) -> Value {
    match value.downcast::<A>() {
        Ok(argument) => Box::new((*argument).proxied(spin)),
        Err(value) => value,
    }
}
