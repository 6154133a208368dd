//! The shared context a running instance hangs off of: the index, the pause
//! gate, the live-client registry, and the flag new sessions check before
//! registering. Grouped into one value rather than a handful of `static`s so
//! a test can build one, drive it over a real socket, and drop it, as many
//! times as it likes in one process.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::index::Index;
use crate::listener::ListenerHandle;
use crate::pause::PauseGate;
use crate::registry::Registry;
use crate::signal::SignalReactor;

pub struct Server {
    pub(crate) index: Index,
    pub(crate) pause_gate: PauseGate,
    pub(crate) registry: Registry,
    accepting: AtomicBool,
}

impl Server {
    pub fn new() -> Arc<Server> {
        Arc::new(Server {
            index: Index::new(),
            pause_gate: PauseGate::new(),
            registry: Registry::new(),
            accepting: AtomicBool::new(true),
        })
    }

    /// Whether a session constructed right now should bother registering.
    /// Sessions that see `false` here skip straight to `Terminating`.
    pub(crate) fn accepting(&self) -> bool {
        self.accepting.load(Ordering::Relaxed)
    }

    /// Writes a snapshot of the index.
    pub fn snapshot(&self, out: &mut dyn std::io::Write) -> std::io::Result<()> {
        self.index.snapshot(out)
    }

    pub fn pause(&self) {
        self.pause_gate.pause();
    }

    pub fn resume(&self) {
        self.pause_gate.resume();
    }

    /// The number of sessions currently registered.
    pub fn live_client_count(&self) -> usize {
        self.registry.len()
    }

    /// Orderly shutdown: stop admitting sessions, cancel every registered
    /// one, wait for the live-client count to hit zero, free the index, then
    /// stop the listener and the signal reactor. Nothing after this call may
    /// touch `self.index` again.
    pub fn shutdown(&self, listener: ListenerHandle, reactor: Option<SignalReactor>) {
        log::info!("server: beginning orderly shutdown");
        self.accepting.store(false, Ordering::Relaxed);
        self.registry.cancel_all();
        self.registry.wait_empty();
        self.index.destroy();
        listener.shutdown();
        if let Some(reactor) = reactor {
            reactor.shutdown();
        }
        log::info!("server: shutdown complete");
    }
}
