//! End-to-end tests driving a real server over loopback TCP sockets, the
//! same way an actual client would.

use std::io::{BufRead, BufReader, Cursor, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use handover_kv::{listener, operator, Server};

struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    fn connect(addr: SocketAddr) -> Client {
        let stream = TcpStream::connect(addr).unwrap();
        let reader = BufReader::new(stream.try_clone().unwrap());
        Client { reader, writer: stream }
    }

    fn request(&mut self, line: &str) -> String {
        self.writer.write_all(line.as_bytes()).unwrap();
        self.writer.write_all(b"\n").unwrap();
        self.writer.flush().unwrap();
        let mut response = String::new();
        self.reader.read_line(&mut response).unwrap();
        response.trim_end_matches(['\r', '\n']).to_string()
    }
}

fn start_server() -> (Arc<Server>, listener::ListenerHandle, SocketAddr) {
    let server = Server::new();
    let handle = listener::spawn(Arc::clone(&server), 0).unwrap();
    let addr = handle.local_addr();
    (server, handle, addr)
}

#[test]
fn add_query_delete_round_trip_over_the_wire() {
    let (server, handle, addr) = start_server();
    let mut client = Client::connect(addr);

    assert_eq!(client.request("a foo bar"), "added");
    assert_eq!(client.request("q foo"), "bar");
    assert_eq!(client.request("d foo"), "removed");
    assert_eq!(client.request("q foo"), "not found");

    drop(client);
    server.shutdown(handle, None);
}

#[test]
fn duplicate_insert_is_rejected_over_the_wire() {
    let (server, handle, addr) = start_server();
    let mut client = Client::connect(addr);

    assert_eq!(client.request("a k1 v1"), "added");
    assert_eq!(client.request("a k1 v2"), "already in database");
    assert_eq!(client.request("q k1"), "v1");

    drop(client);
    server.shutdown(handle, None);
}

#[test]
fn pause_blocks_a_query_until_resume() {
    let (server, handle, addr) = start_server();
    let mut setup = Client::connect(addr);
    assert_eq!(setup.request("a k v"), "added");
    drop(setup);

    server.pause();

    let query_addr = addr;
    let query_thread = thread::spawn(move || {
        let mut client = Client::connect(query_addr);
        client.request("q k")
    });

    thread::sleep(Duration::from_millis(300));
    assert!(!query_thread.is_finished(), "query should still be blocked on the pause gate");

    server.resume();
    assert_eq!(query_thread.join().unwrap(), "v");

    server.shutdown(handle, None);
}

#[test]
fn operator_snapshot_reaches_a_file() {
    let (server, handle, addr) = start_server();
    let mut client = Client::connect(addr);
    assert_eq!(client.request("a a 1"), "added");
    assert_eq!(client.request("a c 2"), "added");
    assert_eq!(client.request("a b 3"), "added");
    drop(client);

    let file = tempfile::NamedTempFile::new().unwrap();
    let command = format!("p {}\n", file.path().display());
    operator::run(&server, Cursor::new(command.into_bytes()), std::io::sink());

    let contents = std::fs::read_to_string(file.path()).unwrap();
    let expected = "(root)\n (null)\n a 1\n  (null)\n  c 2\n   b 3\n    (null)\n    (null)\n   (null)\n";
    assert_eq!(contents, expected);

    server.shutdown(handle, None);
}

#[test]
fn shutdown_drains_every_session_and_stops_the_listener() {
    let (server, handle, addr) = start_server();
    let mut client = Client::connect(addr);
    assert_eq!(client.request("a k v"), "added");

    // Don't close `client`'s socket before shutdown — the session is parked
    // in its read loop, and shutdown must cancel it rather than wait for it
    // to close on its own.
    server.shutdown(handle, None);

    assert_eq!(server.live_client_count(), 0);
    assert!(TcpStream::connect(addr).is_err());
}

#[test]
fn batch_file_populates_the_index_over_the_wire() {
    let (server, handle, addr) = start_server();
    let mut client = Client::connect(addr);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "a k1 v1").unwrap();
    writeln!(file, "a k2 v2").unwrap();
    writeln!(file, "d k1").unwrap();
    file.flush().unwrap();

    let command = format!("f {}", file.path().display());
    assert_eq!(client.request(&command), "file processed");
    assert_eq!(client.request("q k1"), "not found");
    assert_eq!(client.request("q k2"), "v2");

    drop(client);
    server.shutdown(handle, None);
}
