//! The live-client registry and shutdown barrier.
//!
//! Every serving session registers its cancellation token here for as long
//! as it's alive. The registry gives the operator and the signal reactor a
//! way to cancel every session at once, and gives the server a barrier to
//! wait on before it tears the index down: nothing may touch the tree once
//! `destroy` runs, so shutdown must first know that every session has
//! actually observed its cancellation and unwound.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

struct State {
    tokens: Vec<Arc<AtomicBool>>,
}

pub struct Registry {
    state: Mutex<State>,
    empty: Condvar,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            state: Mutex::new(State { tokens: Vec::new() }),
            empty: Condvar::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|_| {
            log::error!("registry: poisoned mutex, aborting");
            std::process::abort();
        })
    }

    /// Registers a new session's cancellation token. The token is removed by
    /// `deregister` when the session exits, on every exit path.
    pub fn register(&self, token: Arc<AtomicBool>) {
        self.lock().tokens.push(token);
    }

    /// Removes a session's token, identified by pointer equality with the
    /// `Arc` the session registered. Wakes anyone waiting in `wait_empty` if
    /// the registry just became empty.
    pub fn deregister(&self, token: &Arc<AtomicBool>) {
        let mut state = self.lock();
        if let Some(pos) = state.tokens.iter().position(|t| Arc::ptr_eq(t, token)) {
            state.tokens.swap_remove(pos);
        }
        if state.tokens.is_empty() {
            self.empty.notify_all();
        }
    }

    /// Flips every currently-registered token's cancellation flag. Sessions
    /// that register afterward aren't affected; the server only calls this
    /// once it has also stopped accepting new connections.
    pub fn cancel_all(&self) {
        let state = self.lock();
        for token in state.tokens.iter() {
            token.store(true, Ordering::Relaxed);
        }
    }

    /// Returns the number of currently-registered sessions.
    pub fn len(&self) -> usize {
        self.lock().tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Blocks until the registry is empty, i.e. every session has
    /// deregistered. Used by the server's shutdown sequence after
    /// `cancel_all`, so that `Index::destroy` only runs once nothing can
    /// still be descending the tree.
    pub fn wait_empty(&self) {
        let mut state = self.lock();
        while !state.tokens.is_empty() {
            state = self.empty.wait(state).unwrap_or_else(|_| {
                log::error!("registry: poisoned mutex, aborting");
                std::process::abort();
            });
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
