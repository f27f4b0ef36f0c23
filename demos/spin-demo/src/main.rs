//! Spin Demo
//!
//! Walks through off- and over-marshaling against a slow ticker bean:
//! calls made on the loop thread run on workers while the loop keeps
//! serving events, and tick notifications fired from a worker arrive back
//! on the loop thread.
//!
//! Run with: cargo run --bin spin-demo -- --delay-ms 200 --dispatcher concealed

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use parking_lot::Mutex;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use eventloop::{EventLoop, Rect};
use spin::config::{DispatcherKind, InterceptorKind};
use spin::{Registry, SpinConfig, Target};

#[derive(Parser)]
#[command(name = "spin-demo")]
#[command(about = "Off- and over-marshaling walkthrough")]
struct Args {
    /// Delay of every bean call, in milliseconds
    #[arg(short, long, default_value = "300")]
    delay_ms: u64,

    /// Number of off-marshaled calls to make from the loop thread
    #[arg(short, long, default_value = "3")]
    calls: usize,

    /// How the loop is pumped during calls: queue, concealed or revealed
    #[arg(long, default_value = "queue")]
    dispatcher: DispatcherKind,

    /// Log marshaling decisions
    #[arg(short, long)]
    verbose: bool,
}

spin::interface! {
    /// Notified on every tick
    pub trait TickListener {
        fn ticked(&self, count: u64);
    }
}

spin::interface! {
    /// Slow service; must stay off the loop thread
    pub trait Ticker {
        fn count(&self) -> u64;
        fn add_tick_listener(&self, listener: #[listener] Arc<dyn TickListener>);
    }
}

struct SlowTicker {
    event_loop: EventLoop,
    delay: Duration,
    count: AtomicU64,
    listeners: Mutex<Vec<Arc<dyn TickListener>>>,
}

impl SlowTicker {
    /// Advance and notify listeners from the calling thread
    fn tick(&self) {
        let count = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.ticked(count);
        }
    }
}

impl Target for SlowTicker {}

impl Ticker for SlowTicker {
    fn count(&self) -> u64 {
        self.event_loop.assert_not_loop_thread();
        thread::sleep(self.delay);
        self.count.load(Ordering::SeqCst)
    }

    fn add_tick_listener(&self, listener: Arc<dyn TickListener>) {
        self.event_loop.assert_not_loop_thread();
        self.listeners.lock().push(listener);
    }
}

/// Loop-side listener, like a label showing the latest count
struct TickLabel {
    event_loop: EventLoop,
}

impl Target for TickLabel {}

impl TickListener for TickLabel {
    fn ticked(&self, count: u64) {
        self.event_loop.assert_loop_thread();
        info!("label updated on the loop thread: tick {}", count);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { Level::TRACE } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_thread_names(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let (event_loop, join) = EventLoop::spawn("demo-loop")?;
    if args.dispatcher == DispatcherKind::Revealed {
        event_loop.open_frame("Spin Demo", Rect::new(0, 0, 1024, 768));
    }

    let config = SpinConfig {
        off_dispatcher: args.dispatcher,
        off_interceptor: InterceptorKind::Listener,
        ..SpinConfig::default()
    };
    let registry = Registry::from_config(&config, event_loop.clone())?;
    info!("using {} dispatching", args.dispatcher);

    let ticker = Arc::new(SlowTicker {
        event_loop: event_loop.clone(),
        delay: Duration::from_millis(args.delay_ms),
        count: AtomicU64::new(0),
        listeners: Mutex::new(Vec::new()),
    });
    let off_ticker = registry.off(ticker.clone() as Arc<dyn Ticker>);
    let label: Arc<dyn TickListener> = Arc::new(TickLabel {
        event_loop: event_loop.clone(),
    });

    let on_loop = event_loop.clone();
    let calls = args.calls;
    event_loop.invoke_and_wait(move || {
        off_ticker.add_tick_listener(label);

        for call in 1..=calls {
            let heartbeats = Arc::new(AtomicUsize::new(0));
            for _ in 0..5 {
                let heartbeats = heartbeats.clone();
                if let Err(e) = on_loop.invoke_later(move || {
                    heartbeats.fetch_add(1, Ordering::SeqCst);
                }) {
                    warn!("heartbeat not queued: {}", e);
                }
            }

            let count = off_ticker.count();
            info!(
                "call {} returned count {} after {} loop events ran during the wait",
                call,
                count,
                heartbeats.load(Ordering::SeqCst)
            );
        }
    })?;

    let worker_ticker = ticker.clone();
    thread::Builder::new()
        .name("ticker".into())
        .spawn(move || {
            for _ in 0..3 {
                worker_ticker.tick();
            }
        })?
        .join()
        .map_err(|_| "ticker thread panicked")?;

    info!("{} ticks delivered; shutting down", ticker.count.load(Ordering::SeqCst));
    event_loop.shutdown();
    join.join().map_err(|_| "loop thread panicked")?;

    Ok(())
}
