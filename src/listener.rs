//! The connection acceptor. A plain `TcpListener` on its own thread, handing
//! each accepted stream off through a channel to a small dispatch thread
//! that spawns the actual session — so the accept loop itself never blocks
//! on session setup, mirroring the dispatcher/worker split of a thread pool.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::server::Server;
use crate::session;

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct ListenerHandle {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
    dispatch_thread: Option<JoinHandle<()>>,
}

/// Binds `port` on the loopback interface (`0` picks an ephemeral port,
/// useful in tests) and starts serving connections in the background.
pub fn spawn(server: Arc<Server>, port: u16) -> io::Result<ListenerHandle> {
    let listener = TcpListener::bind(("127.0.0.1", port))?;
    let local_addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;
    let stop = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<TcpStream>();

    let accept_stop = Arc::clone(&stop);
    let accept_thread = thread::spawn(move || accept_loop(listener, accept_stop, tx));
    let dispatch_thread = thread::spawn(move || dispatch_loop(server, rx));

    Ok(ListenerHandle {
        local_addr,
        stop,
        accept_thread: Some(accept_thread),
        dispatch_thread: Some(dispatch_thread),
    })
}

fn accept_loop(listener: TcpListener, stop: Arc<AtomicBool>, tx: mpsc::Sender<TcpStream>) {
    for attempt in listener.incoming() {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        match attempt {
            Ok(stream) => {
                log::debug!("listener: accepted connection");
                if tx.send(stream).is_err() {
                    break;
                }
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(e) => {
                log::warn!("listener: accept error: {e}");
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
}

fn dispatch_loop(server: Arc<Server>, rx: mpsc::Receiver<TcpStream>) {
    for stream in rx {
        let server = Arc::clone(&server);
        thread::spawn(move || session::run(server, stream));
    }
}

impl ListenerHandle {
    /// The address actually bound — useful when `spawn` was asked for port
    /// `0` and the OS picked one.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops the accept loop and joins both of its threads. The dispatch
    /// thread ends on its own once the accept thread drops its channel
    /// sender.
    pub fn shutdown(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.accept_thread.take() {
            let _ = h.join();
        }
        if let Some(h) = self.dispatch_thread.take() {
            let _ = h.join();
        }
    }
}
