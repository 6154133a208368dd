//! One client session: `Registering → Serving → Terminating`, one thread per
//! connected client. Deregistration is the only cleanup action, and it runs
//! on every exit from `Serving`, cancelled or not.

use std::net::TcpStream;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::command::{self, Outcome};
use crate::server::Server;
use crate::transport::LineTransport;

/// Constructs and runs a session for one accepted connection. Returns once
/// the session has fully deregistered; the caller (the listener's dispatch
/// thread) just needs to let this run to completion on its own thread.
pub fn run(server: Arc<Server>, stream: TcpStream) {
    if !server.accepting() {
        log::debug!("session: server no longer accepting, dropping connection");
        return;
    }

    let token = Arc::new(AtomicBool::new(false));
    server.registry.register(Arc::clone(&token));
    log::info!("session: registered, {} live", server.registry.len());

    match LineTransport::new(stream) {
        Ok(mut transport) => serve(&server, &mut transport, &token),
        Err(e) => log::warn!("session: failed to set up transport: {e}"),
    }

    server.registry.deregister(&token);
    log::info!("session: deregistered, {} live", server.registry.len());
}

fn serve(server: &Server, transport: &mut LineTransport, token: &Arc<AtomicBool>) {
    loop {
        let line = match transport.read_line(token) {
            Ok(Some(line)) => line,
            Ok(None) => {
                log::debug!("session: peer closed connection");
                return;
            }
            Err(_) => {
                log::debug!("session: cancelled or errored while reading");
                return;
            }
        };

        if !server.pause_gate.wait(token) {
            log::debug!("session: cancelled while paused");
            return;
        }

        match command::interpret(&line, &server.index, token) {
            Outcome::Response(response) => {
                if transport.write_line(&response).is_err() {
                    log::debug!("session: cancelled or errored while writing");
                    return;
                }
            }
            Outcome::Cancelled => {
                log::debug!("session: cancelled mid-batch");
                return;
            }
        }
    }
}
