//! Registry of default marshaling
//!
//! The [`Registry`] holds the proxy factory, spinners and interceptor
//! chains used by [`off`](crate::off) and [`over`](crate::over). Defaults
//! are read when a proxy is created: replacing one affects proxies created
//! afterwards, never those already handed out.

use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use eventloop::EventLoop;
use tracing::{debug, warn};

use crate::config::SpinConfig;
use crate::error::Result;
use crate::interceptor::Interceptor;
use crate::proxy::{Interface, ProxyFactory, Spin, StandardProxyFactory};
use crate::spinner::{OffSpinner, OverSpinner, Spinner};

#[derive(Clone, Debug)]
struct Defaults {
    proxy_factory: Arc<dyn ProxyFactory>,
    off_spinner: Arc<dyn Spinner>,
    over_spinner: Arc<dyn Spinner>,
    off_interceptors: Vec<Arc<dyn Interceptor>>,
    over_interceptors: Vec<Arc<dyn Interceptor>>,
}

/// Default marshaling, shared by every thread
///
/// Reads take a consistent snapshot of all defaults; updates replace the
/// snapshot atomically.
pub struct Registry {
    event_loop: EventLoop,
    defaults: ArcSwap<Defaults>,
}

impl Registry {
    /// Standard factory, thread-per-call off-spinning with queue
    /// dispatching, waiting over-spinning, no interceptors
    pub fn new(event_loop: EventLoop) -> Self {
        let defaults = Defaults {
            proxy_factory: Arc::new(StandardProxyFactory),
            off_spinner: Arc::new(OffSpinner::with_defaults(event_loop.clone())),
            over_spinner: Arc::new(OverSpinner::new(event_loop.clone())),
            off_interceptors: Vec::new(),
            over_interceptors: Vec::new(),
        };
        Self {
            event_loop,
            defaults: ArcSwap::from_pointee(defaults),
        }
    }

    /// Build the defaults `config` selects
    pub fn from_config(config: &SpinConfig, event_loop: EventLoop) -> Result<Self> {
        config.validate()?;

        let proxy_factory = config.build_proxy_factory();
        let off_spinner: Arc<dyn Spinner> = Arc::new(OffSpinner::new(
            event_loop.clone(),
            config.build_starter()?,
            config.build_dispatcher_factory(),
        ));
        let over_spinner: Arc<dyn Spinner> =
            Arc::new(OverSpinner::with_wait(event_loop.clone(), config.over_wait));

        // Listeners registered through off-proxies are wrapped with this
        // registry's over-marshaling, not the global one
        let bare_over = Spin::new(Arc::clone(&over_spinner)).with_factory(Arc::clone(&proxy_factory));
        let over_interceptors = SpinConfig::build_interceptors(config.over_interceptor, &bare_over);
        let over = bare_over.with_interceptors(over_interceptors.clone());
        let off_interceptors = SpinConfig::build_interceptors(config.off_interceptor, &over);

        let defaults = Defaults {
            proxy_factory,
            off_spinner,
            over_spinner,
            off_interceptors,
            over_interceptors,
        };
        debug!("spin registry configured: {:?}", config);

        Ok(Self {
            event_loop,
            defaults: ArcSwap::from_pointee(defaults),
        })
    }

    /// The process-wide registry, bound to [`EventLoop::main`]
    ///
    /// Configured from the environment on first use. An invalid
    /// environment is logged and the compiled-in defaults are used.
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();

        GLOBAL.get_or_init(|| {
            let event_loop = EventLoop::main().clone();
            let config = SpinConfig::from_env().unwrap_or_else(|e| {
                warn!("ignoring spin environment: {}", e);
                SpinConfig::default()
            });
            Registry::from_config(&config, event_loop.clone()).unwrap_or_else(|e| {
                warn!("falling back to default spin registry: {}", e);
                Registry::new(event_loop)
            })
        })
    }

    /// The loop this registry's default spinners marshal around
    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    fn update(&self, change: impl Fn(&mut Defaults)) {
        self.defaults.rcu(|current| {
            let mut next = Defaults::clone(current);
            change(&mut next);
            next
        });
    }

    pub fn proxy_factory(&self) -> Arc<dyn ProxyFactory> {
        Arc::clone(&self.defaults.load().proxy_factory)
    }

    pub fn set_proxy_factory(&self, factory: Arc<dyn ProxyFactory>) {
        self.update(|defaults| defaults.proxy_factory = Arc::clone(&factory));
    }

    pub fn off_spinner(&self) -> Arc<dyn Spinner> {
        Arc::clone(&self.defaults.load().off_spinner)
    }

    pub fn set_off_spinner(&self, spinner: Arc<dyn Spinner>) {
        self.update(|defaults| defaults.off_spinner = Arc::clone(&spinner));
    }

    pub fn over_spinner(&self) -> Arc<dyn Spinner> {
        Arc::clone(&self.defaults.load().over_spinner)
    }

    pub fn set_over_spinner(&self, spinner: Arc<dyn Spinner>) {
        self.update(|defaults| defaults.over_spinner = Arc::clone(&spinner));
    }

    pub fn off_interceptors(&self) -> Vec<Arc<dyn Interceptor>> {
        self.defaults.load().off_interceptors.clone()
    }

    pub fn set_off_interceptors(&self, interceptors: Vec<Arc<dyn Interceptor>>) {
        self.update(|defaults| defaults.off_interceptors = interceptors.clone());
    }

    pub fn over_interceptors(&self) -> Vec<Arc<dyn Interceptor>> {
        self.defaults.load().over_interceptors.clone()
    }

    pub fn set_over_interceptors(&self, interceptors: Vec<Arc<dyn Interceptor>>) {
        self.update(|defaults| defaults.over_interceptors = interceptors.clone());
    }

    /// Current defaults for off-marshaling
    pub fn off_spin(&self) -> Spin {
        let defaults = self.defaults.load_full();
        Spin::new(Arc::clone(&defaults.off_spinner))
            .with_factory(Arc::clone(&defaults.proxy_factory))
            .with_interceptors(defaults.off_interceptors.clone())
    }

    /// Current defaults for over-marshaling
    pub fn over_spin(&self) -> Spin {
        let defaults = self.defaults.load_full();
        Spin::new(Arc::clone(&defaults.over_spinner))
            .with_factory(Arc::clone(&defaults.proxy_factory))
            .with_interceptors(defaults.over_interceptors.clone())
    }

    /// Wrap `target` so calls made on the loop thread run off it
    pub fn off<I: Interface + ?Sized>(&self, target: Arc<I>) -> Arc<I> {
        self.off_spin().proxy(target)
    }

    /// Wrap `target` so calls made off the loop thread run on it
    pub fn over<I: Interface + ?Sized>(&self, target: Arc<I>) -> Arc<I> {
        self.over_spin().proxy(target)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("event_loop", &self.event_loop)
            .field("defaults", &**self.defaults.load())
            .finish()
    }
}
