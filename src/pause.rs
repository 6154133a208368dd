//! The operator's pause gate: a single latch that every client thread checks
//! before it touches the index, so `stop`/`release` take effect for requests
//! that haven't started yet as well as ones already blocked on the gate.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// How often a waiting thread wakes up to re-check its cancellation token
/// while the gate is held shut. Keeps shutdown latency bounded even though
/// there's no way to interrupt a `Condvar::wait` directly.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct PauseGate {
    stopped: Mutex<bool>,
    released: Condvar,
}

impl PauseGate {
    pub fn new() -> Self {
        PauseGate {
            stopped: Mutex::new(false),
            released: Condvar::new(),
        }
    }

    /// Sets the latch. Every thread currently in `wait` stays blocked; every
    /// thread that calls `wait` after this returns blocks too, until `resume`.
    pub fn pause(&self) {
        let mut stopped = self.stopped.lock().unwrap_or_else(|_| {
            log::error!("pause gate: poisoned mutex, aborting");
            std::process::abort();
        });
        *stopped = true;
    }

    /// Clears the latch and wakes every thread parked in `wait`.
    pub fn resume(&self) {
        let mut stopped = self.stopped.lock().unwrap_or_else(|_| {
            log::error!("pause gate: poisoned mutex, aborting");
            std::process::abort();
        });
        *stopped = false;
        self.released.notify_all();
    }

    /// Blocks while the gate is shut, waking periodically to poll
    /// `cancelled`. Returns `true` if the caller should proceed, `false` if
    /// it was cancelled while waiting and should unwind instead.
    pub fn wait(&self, cancelled: &std::sync::atomic::AtomicBool) -> bool {
        use std::sync::atomic::Ordering;

        let mut stopped = self.stopped.lock().unwrap_or_else(|_| {
            log::error!("pause gate: poisoned mutex, aborting");
            std::process::abort();
        });
        while *stopped {
            if cancelled.load(Ordering::Relaxed) {
                return false;
            }
            let (guard, _timeout) = self
                .released
                .wait_timeout(stopped, POLL_INTERVAL)
                .unwrap_or_else(|_| {
                    log::error!("pause gate: poisoned mutex, aborting");
                    std::process::abort();
                });
            stopped = guard;
        }
        !cancelled.load(Ordering::Relaxed)
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn wait_passes_through_when_not_paused() {
        let gate = PauseGate::new();
        let cancelled = AtomicBool::new(false);
        assert!(gate.wait(&cancelled));
    }

    #[test]
    fn pause_blocks_until_resume() {
        let gate = Arc::new(PauseGate::new());
        gate.pause();

        let waiter_gate = Arc::clone(&gate);
        let cancelled = Arc::new(AtomicBool::new(false));
        let waiter_cancelled = Arc::clone(&cancelled);
        let handle = thread::spawn(move || waiter_gate.wait(&waiter_cancelled));

        thread::sleep(Duration::from_millis(250));
        assert!(!handle.is_finished());

        gate.resume();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn cancellation_unblocks_a_paused_wait() {
        let gate = Arc::new(PauseGate::new());
        gate.pause();

        let waiter_gate = Arc::clone(&gate);
        let cancelled = Arc::new(AtomicBool::new(false));
        let waiter_cancelled = Arc::clone(&cancelled);
        let handle = thread::spawn(move || waiter_gate.wait(&waiter_cancelled));

        cancelled.store(true, std::sync::atomic::Ordering::Relaxed);
        assert!(!handle.join().unwrap());
    }
}
