//! Invocation envelope
//!
//! An [`Invocation`] reifies one method call on a wrapped target: the method
//! descriptor, the arguments, and once evaluated, the captured outcome.
//! It is created per call by a [`Proxy`](crate::Proxy), threaded through the
//! interceptor chain, handed to a [`Spinner`] and evaluated at most once,
//! possibly on another thread than the one that created it.

use std::any::{self, Any};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace};

use crate::error::{Result, SpinError};
use crate::interceptor::Interceptor;
use crate::proxy::{Spin, TargetId};
use crate::spinner::{Spinner, SpinnerKind, Spun};

/// A type-erased argument or return value
pub type Value = Box<dyn Any + Send>;

/// The call bound to its target, consuming the arguments
pub type Call = Box<dyn FnOnce(Vec<Value>) -> Value + Send>;

/// Replaces an argument with a proxy of itself
pub type Rewrap = fn(Value, &Spin) -> Value;

/// Whether a method hands back a value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Returns {
    /// Nothing to hand back; may be spun without waiting
    Unit,
    Value,
}

/// Declared kind of a parameter
#[derive(Clone, Copy)]
pub enum ParamKind {
    Value,
    /// A callback capability that interceptors may wrap in a proxy
    Listener(Rewrap),
}

impl ParamKind {
    pub fn is_listener(&self) -> bool {
        matches!(self, ParamKind::Listener(_))
    }
}

impl fmt::Debug for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Value => f.write_str("Value"),
            ParamKind::Listener(_) => f.write_str("Listener"),
        }
    }
}

/// Method parameter descriptor
#[derive(Clone, Copy, Debug)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
}

/// Method descriptor
#[derive(Debug)]
pub struct Method {
    /// Name of the declaring interface
    pub interface: &'static str,
    /// Method name
    pub name: &'static str,
    /// Parameters in call order
    pub params: &'static [Param],
    pub returns: Returns,
}

impl Method {
    /// Check whether this method returns a value
    pub fn returns_value(&self) -> bool {
        self.returns == Returns::Value
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.interface, self.name)
    }
}

/// Arguments handed to the bound call, taken in declaration order
pub struct Arguments {
    method: &'static Method,
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl Arguments {
    pub fn new(method: &'static Method, values: Vec<Value>) -> Self {
        Self {
            method,
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Take the next argument
    ///
    /// Panics if the argument is missing or was replaced by a value of
    /// another type; both are programming errors in an interceptor.
    pub fn take<T: Any>(&mut self) -> T {
        let position = self.position;
        self.position += 1;
        match self.values.next() {
            Some(value) => match value.downcast::<T>() {
                Ok(value) => *value,
                Err(_) => panic!(
                    "argument {} of {} is not a {}",
                    position,
                    self.method,
                    any::type_name::<T>()
                ),
            },
            None => panic!("{} has no argument {}", self.method, position),
        }
    }
}

/// One method call awaiting or having undergone evaluation
pub struct Invocation {
    /// Sequence number, for tracing
    id: u64,
    method: &'static Method,
    target: Option<TargetId>,
    arguments: Mutex<Vec<Value>>,
    /// Taken by the one and only evaluation
    call: Mutex<Option<Call>>,
    /// Returned value, or the panic payload of a failed call
    outcome: Mutex<Option<thread::Result<Value>>>,
    evaluated: AtomicBool,
    /// Set when the target panicked, kept after the outcome is taken
    panicked: AtomicBool,
    started: AtomicBool,
    spinner: Arc<dyn Spinner>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    /// Index of the next interceptor to run
    next: AtomicUsize,
}

impl Invocation {
    /// Create an invocation to be spun by `spinner`
    pub fn new(
        method: &'static Method,
        arguments: Vec<Value>,
        call: Call,
        spinner: Arc<dyn Spinner>,
    ) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);

        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            method,
            target: None,
            arguments: Mutex::new(arguments),
            call: Mutex::new(Some(call)),
            outcome: Mutex::new(None),
            evaluated: AtomicBool::new(false),
            panicked: AtomicBool::new(false),
            started: AtomicBool::new(false),
            spinner,
            interceptors: Vec::new(),
            next: AtomicUsize::new(0),
        }
    }

    /// Record the identity of the target
    pub fn with_target(mut self, target: TargetId) -> Self {
        self.target = Some(target);
        self
    }

    /// Interceptors to run, in order, before the invocation is spun
    pub fn with_interceptors(mut self, interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        self.interceptors = interceptors;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn method(&self) -> &'static Method {
        self.method
    }

    pub fn target(&self) -> Option<TargetId> {
        self.target
    }

    /// Mutable access to the arguments, until evaluation consumes them
    pub fn arguments(&self) -> MutexGuard<'_, Vec<Value>> {
        self.arguments.lock()
    }

    pub fn spinner(&self) -> &Arc<dyn Spinner> {
        &self.spinner
    }

    /// Marshaling discipline this invocation will be spun with
    pub fn spinner_kind(&self) -> SpinnerKind {
        self.spinner.kind()
    }

    /// Check whether evaluation has completed
    pub fn is_evaluated(&self) -> bool {
        self.evaluated.load(Ordering::SeqCst)
    }

    /// Check whether the evaluated target panicked
    pub fn panicked(&self) -> bool {
        self.panicked.load(Ordering::SeqCst)
    }

    /// Proceed with the call
    ///
    /// Runs the next interceptor if one is left; otherwise hands the
    /// invocation to its spinner and returns the captured value. A panic
    /// captured from the target is resumed here, on the caller's thread.
    pub fn start(self: &Arc<Self>) -> Result<Value> {
        let position = self.next.fetch_add(1, Ordering::SeqCst);
        if let Some(interceptor) = self.interceptors.get(position) {
            trace!("invocation {} of {} entering {:?}", self.id, self.method, interceptor);
            return interceptor.intercept(self);
        }

        if self.started.swap(true, Ordering::SeqCst) {
            return Err(SpinError::AlreadyEvaluated(self.method.to_string()));
        }

        let spun = self.spinner.spin(self)?;
        self.take_result(spun)
    }

    fn take_result(&self, spun: Spun) -> Result<Value> {
        if spun == Spun::Detached {
            return Ok(Box::new(()));
        }

        let outcome = self.outcome.lock().take();
        match outcome {
            Some(Ok(value)) => Ok(value),
            Some(Err(payload)) => panic::resume_unwind(payload),
            None => Err(SpinError::NotEvaluated(self.method.to_string())),
        }
    }

    /// Evaluate the call against the target, capturing its outcome
    ///
    /// Runs on whatever thread the spinner chose. Fails if the invocation
    /// was already evaluated.
    pub fn evaluate(&self) -> Result<()> {
        let call = self
            .call
            .lock()
            .take()
            .ok_or_else(|| SpinError::AlreadyEvaluated(self.method.to_string()))?;
        let arguments = std::mem::take(&mut *self.arguments.lock());

        trace!("evaluating invocation {} of {}", self.id, self.method);
        let outcome = panic::catch_unwind(AssertUnwindSafe(move || call(arguments)));
        if outcome.is_err() {
            debug!("invocation {} of {} panicked", self.id, self.method);
            self.panicked.store(true, Ordering::SeqCst);
        }

        *self.outcome.lock() = Some(outcome);
        self.evaluated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("id", &self.id)
            .field("method", &format_args!("{}", self.method))
            .field("target", &self.target)
            .field("kind", &self.spinner_kind())
            .field("evaluated", &self.is_evaluated())
            .finish()
    }
}
