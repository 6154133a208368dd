//! The wire format: one command line in, one response line out, over a
//! plain TCP socket. `LineTransport` carries no locking discipline of its
//! own — it exists purely to turn a byte stream into cancellable line reads.

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};

/// Bound on a single read attempt. Small enough that a cancelled session
/// notices promptly, large enough not to spin the thread.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct LineTransport {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl LineTransport {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_read_timeout(Some(READ_POLL_INTERVAL))?;
        let reader_half = stream.try_clone()?;
        Ok(LineTransport {
            reader: BufReader::new(reader_half),
            writer: BufWriter::new(stream),
        })
    }

    /// Reads one line, with the trailing newline (and any `\r`) stripped.
    /// Polls `cancelled` on every read timeout, so a cancelled session
    /// blocked on an idle connection unblocks within one poll interval.
    /// Returns `Ok(None)` on a clean peer close.
    pub fn read_line(&mut self, cancelled: &AtomicBool) -> Result<Option<String>> {
        let mut buf = String::new();
        loop {
            if cancelled.load(Ordering::Relaxed) {
                return Err(Error::Transport);
            }
            match self.reader.read_line(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    let trimmed = buf.trim_end_matches(['\r', '\n']);
                    return Ok(Some(trimmed.to_string()));
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    continue;
                }
                Err(_) => return Err(Error::Transport),
            }
        }
    }

    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush())
            .map_err(|_| Error::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn round_trips_a_line() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut transport = LineTransport::new(stream).unwrap();
            let cancelled = AtomicBool::new(false);
            let line = transport.read_line(&cancelled).unwrap().unwrap();
            transport.write_line(&line.to_uppercase()).unwrap();
        });

        let client = TcpStream::connect(addr).unwrap();
        let mut transport = LineTransport::new(client).unwrap();
        transport.write_line("hello").unwrap();
        let cancelled = AtomicBool::new(false);
        let reply = transport.read_line(&cancelled).unwrap().unwrap();
        assert_eq!(reply, "HELLO");

        server.join().unwrap();
    }

    #[test]
    fn cancelled_read_returns_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).unwrap();
        let (stream, _) = listener.accept().unwrap();

        let mut transport = LineTransport::new(stream).unwrap();
        let cancelled = AtomicBool::new(true);
        assert!(matches!(transport.read_line(&cancelled), Err(Error::Transport)));
    }
}
