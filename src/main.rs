use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use handover_kv::signal::SignalReactor;
use handover_kv::{listener, operator, Server};

/// A concurrent in-memory key/value store served over a line protocol.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TCP port to listen on.
    port: u16,
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // clap's own `exit()` uses status 2 for usage errors; the
            // distilled behavior this crate preserves is a flat 1.
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(args.port) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("fatal: {e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(port: u16) -> Result<()> {
    let server = Server::new();

    let listener_handle = listener::spawn(Arc::clone(&server), port)
        .with_context(|| format!("failed to bind port {port}"))?;
    log::info!("listening on port {port}");

    let reactor = match SignalReactor::spawn(Arc::clone(&server)) {
        Ok(reactor) => Some(reactor),
        Err(e) => {
            log::warn!("signal: could not install SIGINT handler: {e}");
            None
        }
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    operator::run(&server, stdin.lock(), stdout.lock());

    server.shutdown(listener_handle, reactor);
    Ok(())
}
