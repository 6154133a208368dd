//! The command interpreter: turns one line of input into one line of
//! output, driving the index and — for `f <path>` — itself, recursively,
//! once per line of a batch file. Holds no state of its own; everything it
//! needs is passed in by the caller.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Error;
use crate::index::{Index, Inserted, Removed};

/// What a line of input turned into. `Cancelled` only ever comes out of a
/// batch file whose session was cancelled mid-read; the caller must not
/// write a response in that case, only unwind.
pub enum Outcome {
    Response(String),
    Cancelled,
}

impl Outcome {
    fn of(s: impl Into<String>) -> Outcome {
        Outcome::Response(s.into())
    }
}

/// Interprets one line against `index`. `cancelled` is polled between lines
/// of a batch file, the one place this function can take a meaningful
/// amount of time; a single `q`/`a`/`d` command always returns promptly.
pub fn interpret(line: &str, index: &Index, cancelled: &AtomicBool) -> Outcome {
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some("q") => match tokens.next() {
            Some(key) => Outcome::of(query(index, key)),
            None => Outcome::of(Error::IllFormed.to_string()),
        },
        Some("a") => match (tokens.next(), tokens.next()) {
            (Some(key), Some(value)) => Outcome::of(add(index, key, value)),
            _ => Outcome::of(Error::IllFormed.to_string()),
        },
        Some("d") => match tokens.next() {
            Some(key) => Outcome::of(delete(index, key)),
            None => Outcome::of(Error::IllFormed.to_string()),
        },
        Some("f") => match tokens.next() {
            Some(path) => run_batch(path, index, cancelled),
            None => Outcome::of(Error::IllFormed.to_string()),
        },
        _ => Outcome::of(Error::IllFormed.to_string()),
    }
}

fn query(index: &Index, key: &str) -> String {
    match index.lookup(key) {
        Some(value) => value,
        None => Error::NotFound.to_string(),
    }
}

fn add(index: &Index, key: &str, value: &str) -> String {
    match index.insert(key, value) {
        Ok(Inserted::Added) => "added".to_string(),
        Ok(Inserted::Duplicate) => Error::Duplicate.to_string(),
        Err(e) => e.to_string(),
    }
}

fn delete(index: &Index, key: &str) -> String {
    match index.remove(key) {
        Removed::Removed => "removed".to_string(),
        Removed::NotFound => "not in database".to_string(),
    }
}

/// Runs every line of `path` through `interpret`, discarding each line's own
/// response — only the side effects on `index` matter — and checking
/// `cancelled` before each line, exactly as the source polls cancellation
/// between `fgets` calls. A read error partway through the file ends the
/// batch the same as a clean EOF would.
fn run_batch(path: &str, index: &Index, cancelled: &AtomicBool) -> Outcome {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return Outcome::of(Error::BadPath.to_string()),
    };
    let reader = BufReader::new(file);
    for line in reader.lines() {
        if cancelled.load(Ordering::Relaxed) {
            return Outcome::Cancelled;
        }
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        match interpret(&line, index, cancelled) {
            Outcome::Response(_) => {}
            Outcome::Cancelled => return Outcome::Cancelled,
        }
    }
    Outcome::of("file processed")
}
