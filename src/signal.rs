//! The interrupt reactor: a dedicated, joinable thread that cancels every
//! registered session on each SIGINT delivery, leaving the listener and
//! operator alone. Built on the `ctrlc` crate, which does the actual signal
//! masking; a channel turns its process-wide callback into a real thread we
//! can stop and join during orderly shutdown.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::server::Server;

const REACTOR_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct SignalReactor {
    stop_tx: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl SignalReactor {
    /// Registers the process's SIGINT handler and starts the reactor
    /// thread. Fails if a handler is already installed in this process.
    pub fn spawn(server: Arc<Server>) -> Result<SignalReactor, ctrlc::Error> {
        let (sig_tx, sig_rx) = mpsc::channel::<()>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        ctrlc::set_handler(move || {
            let _ = sig_tx.send(());
        })?;

        let handle = thread::spawn(move || loop {
            match sig_rx.recv_timeout(REACTOR_POLL_INTERVAL) {
                Ok(()) => {
                    println!("SIGINT received, cancelling all clients");
                    log::warn!("signal: SIGINT received, cancelling all clients");
                    server.registry.cancel_all();
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
            if stop_rx.try_recv().is_ok() {
                return;
            }
        });

        Ok(SignalReactor {
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Stops and joins the reactor thread. Does not and cannot uninstall the
    /// process's SIGINT handler — the `ctrlc` crate offers no way to do
    /// that, so a delivery after shutdown would just find an empty registry.
    pub fn shutdown(mut self) {
        let _ = self.stop_tx.send(());
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}
