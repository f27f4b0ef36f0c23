//! Spin configuration
//!
//! [`SpinConfig`] selects the registry defaults. Every setting has a
//! compiled-in default and can be overridden from the environment:
//!
//! | Variable                      | Values                            | Default    |
//! |-------------------------------|-----------------------------------|------------|
//! | `SPIN_PROXY_FACTORY`          | `standard`                        | `standard` |
//! | `SPIN_OFF_STARTER`            | `thread`, `runtime`               | `thread`   |
//! | `SPIN_OFF_DISPATCHER_FACTORY` | `queue`, `concealed`, `revealed`  | `queue`    |
//! | `SPIN_OFF_INTERCEPTOR`        | `none`, `listener`                | `none`     |
//! | `SPIN_OVER_INTERCEPTOR`       | `none`                            | `none`     |
//! | `SPIN_OVER_WAIT`              | `true`, `false`                   | `true`     |
//! | `SPIN_RUNTIME_WORKERS`        | positive integer                  | `8`        |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::dispatcher::{
    ConcealedDialogDispatcherFactory, DispatcherFactory, QueueDispatcherFactory,
    RevealedDialogDispatcherFactory,
};
use crate::error::{Result, SpinError};
use crate::interceptor::{Interceptor, ListenerOver};
use crate::proxy::{ProxyFactory, Spin, StandardProxyFactory};
use crate::starter::{RuntimeStarter, Starter, ThreadStarter};

pub const SPIN_PROXY_FACTORY: &str = "SPIN_PROXY_FACTORY";
pub const SPIN_OFF_STARTER: &str = "SPIN_OFF_STARTER";
pub const SPIN_OFF_DISPATCHER_FACTORY: &str = "SPIN_OFF_DISPATCHER_FACTORY";
pub const SPIN_OFF_INTERCEPTOR: &str = "SPIN_OFF_INTERCEPTOR";
pub const SPIN_OVER_INTERCEPTOR: &str = "SPIN_OVER_INTERCEPTOR";
pub const SPIN_OVER_WAIT: &str = "SPIN_OVER_WAIT";
pub const SPIN_RUNTIME_WORKERS: &str = "SPIN_RUNTIME_WORKERS";

/// Default size of the runtime starter's blocking pool
pub const DEFAULT_RUNTIME_WORKERS: usize = 8;

macro_rules! named_kinds {
    ($(#[$meta:meta])* $name:ident, $what:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = SpinError;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(SpinError::Config(format!(
                        "unknown {} '{}'",
                        $what, other
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

named_kinds! {
    /// Proxy factory selection
    ProxyFactoryKind, "proxy factory" {
        Standard => "standard",
    }
}

named_kinds! {
    /// How off-marshaled calls get their worker thread
    StarterKind, "starter" {
        Thread => "thread",
        Runtime => "runtime",
    }
}

named_kinds! {
    /// How the loop is kept pumping during off-marshaled calls
    DispatcherKind, "dispatcher factory" {
        Queue => "queue",
        Concealed => "concealed",
        Revealed => "revealed",
    }
}

named_kinds! {
    /// Default interceptor selection
    InterceptorKind, "interceptor" {
        None => "none",
        Listener => "listener",
    }
}

/// Registry defaults
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpinConfig {
    pub proxy_factory: ProxyFactoryKind,
    pub off_starter: StarterKind,
    pub off_dispatcher: DispatcherKind,
    pub off_interceptor: InterceptorKind,
    pub over_interceptor: InterceptorKind,
    /// Whether over-marshaled callers wait for the loop
    pub over_wait: bool,
    /// Blocking pool size for [`StarterKind::Runtime`]
    pub runtime_workers: usize,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            proxy_factory: ProxyFactoryKind::Standard,
            off_starter: StarterKind::Thread,
            off_dispatcher: DispatcherKind::Queue,
            off_interceptor: InterceptorKind::None,
            over_interceptor: InterceptorKind::None,
            over_wait: true,
            runtime_workers: DEFAULT_RUNTIME_WORKERS,
        }
    }
}

impl SpinConfig {
    /// Read overrides from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup(SPIN_PROXY_FACTORY) {
            config.proxy_factory = value.parse()?;
        }
        if let Some(value) = lookup(SPIN_OFF_STARTER) {
            config.off_starter = value.parse()?;
        }
        if let Some(value) = lookup(SPIN_OFF_DISPATCHER_FACTORY) {
            config.off_dispatcher = value.parse()?;
        }
        if let Some(value) = lookup(SPIN_OFF_INTERCEPTOR) {
            config.off_interceptor = value.parse()?;
        }
        if let Some(value) = lookup(SPIN_OVER_INTERCEPTOR) {
            config.over_interceptor = value.parse()?;
        }
        if let Some(value) = lookup(SPIN_OVER_WAIT) {
            config.over_wait = parse_bool(SPIN_OVER_WAIT, &value)?;
        }
        if let Some(value) = lookup(SPIN_RUNTIME_WORKERS) {
            config.runtime_workers = match value.trim().parse::<usize>() {
                Ok(workers) if workers > 0 => workers,
                _ => {
                    return Err(SpinError::Config(format!(
                        "{} must be a positive integer, got '{}'",
                        SPIN_RUNTIME_WORKERS, value
                    )))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.over_interceptor == InterceptorKind::Listener {
            return Err(SpinError::Config(
                "the listener interceptor only applies to off-marshaling".into(),
            ));
        }
        Ok(())
    }

    pub fn build_proxy_factory(&self) -> Arc<dyn ProxyFactory> {
        match self.proxy_factory {
            ProxyFactoryKind::Standard => Arc::new(StandardProxyFactory),
        }
    }

    pub fn build_starter(&self) -> Result<Arc<dyn Starter>> {
        Ok(match self.off_starter {
            StarterKind::Thread => Arc::new(ThreadStarter::new()),
            StarterKind::Runtime => Arc::new(RuntimeStarter::new(self.runtime_workers)?),
        })
    }

    pub fn build_dispatcher_factory(&self) -> Arc<dyn DispatcherFactory> {
        match self.off_dispatcher {
            DispatcherKind::Queue => Arc::new(QueueDispatcherFactory),
            DispatcherKind::Concealed => Arc::new(ConcealedDialogDispatcherFactory::new()),
            DispatcherKind::Revealed => Arc::new(RevealedDialogDispatcherFactory),
        }
    }

    /// Interceptor chain for `kind`; listeners get wrapped with `over`
    pub fn build_interceptors(kind: InterceptorKind, over: &Spin) -> Vec<Arc<dyn Interceptor>> {
        match kind {
            InterceptorKind::None => Vec::new(),
            InterceptorKind::Listener => vec![Arc::new(ListenerOver::with_spin(over.clone()))],
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(SpinError::Config(format!(
            "{} must be true or false, got '{}'",
            key, value
        ))),
    }
}
