//! The operator console: one administrative command per line from any
//! `BufRead`, so the real binary drives it from standard input and tests
//! drive it from an in-memory buffer. Returns when its input ends, which is
//! the caller's cue to begin orderly shutdown.

use std::fs::File;
use std::io::{BufRead, Write};

use crate::server::Server;

/// Runs the operator loop to completion (i.e. until `input` hits EOF).
/// `out` receives the human-readable acknowledgement of each command.
pub fn run<R: BufRead, W: Write>(server: &Server, input: R, mut out: W) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("operator: read error, treating as end of input: {e}");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        // The leading token, not just the leading byte: `p` is an exact
        // match (it takes an optional path argument), while `s`/`g` match by
        // prefix on that same token, matching the source's `strcmp`-vs-
        // `strncmp` split between the two kinds of command.
        let (command, rest) = match trimmed.find(char::is_whitespace) {
            Some(idx) => (&trimmed[..idx], trimmed[idx..].trim()),
            None => (trimmed, ""),
        };

        match command {
            "p" => snapshot(server, rest, &mut out),
            _ if command.starts_with('s') => {
                server.pause();
                log::info!("operator: paused");
                let _ = writeln!(out, "stopping all clients");
            }
            _ if command.starts_with('g') => {
                server.resume();
                log::info!("operator: resumed");
                let _ = writeln!(out, "releasing all clients");
            }
            _ => log::warn!("operator: unrecognized command {trimmed:?}"),
        }
    }
    log::info!("operator: end of input");
}

fn snapshot<W: Write>(server: &Server, path: &str, out: &mut W) {
    if path.is_empty() {
        if let Err(e) = server.snapshot(out) {
            log::warn!("operator: snapshot to stdout failed: {e}");
        }
        return;
    }
    match File::create(path) {
        Ok(mut file) => {
            if let Err(e) = server.snapshot(&mut file) {
                log::warn!("operator: snapshot to {path} failed: {e}");
            }
        }
        Err(e) => log::warn!("operator: could not create snapshot file {path}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Server as RealServer;
    use std::io::Cursor;

    #[test]
    fn pause_and_resume_are_acknowledged() {
        let server = RealServer::new();
        let input = Cursor::new(b"s\ng\n".to_vec());
        let mut out = Vec::new();
        run(&server, input, &mut out);
        assert_eq!(String::from_utf8(out).unwrap(), "stopping all clients\nreleasing all clients\n");
    }

    #[test]
    fn blank_lines_and_unknown_commands_are_ignored() {
        let server = RealServer::new();
        let input = Cursor::new(b"\n  \nz bogus\n".to_vec());
        let mut out = Vec::new();
        run(&server, input, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn words_starting_with_p_are_not_mistaken_for_snapshot() {
        let server = RealServer::new();
        let input = Cursor::new(b"ping\n".to_vec());
        let mut out = Vec::new();
        run(&server, input, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn snapshot_to_stdout_dumps_the_tree() {
        let server = RealServer::new();
        server.index.insert("a", "1").unwrap();
        let input = Cursor::new(b"p\n".to_vec());
        let mut out = Vec::new();
        run(&server, input, &mut out);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("a 1"));
    }

    #[test]
    fn snapshot_to_path_writes_a_file() {
        let server = RealServer::new();
        server.index.insert("a", "1").unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        let line = format!("p {}\n", file.path().display());
        let input = Cursor::new(line.into_bytes());
        let mut out = Vec::new();
        run(&server, input, &mut out);
        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.contains("a 1"));
    }
}
