//! Error kinds shared by the index, the interpreter, and the session loop.

use thiserror::Error;

/// The maximum length, in bytes, of a key or a value.
pub const MAX_FIELD_LEN: usize = 256;

/// Everything that can go wrong below the process boundary.
///
/// Command-level variants (`TooLong`, `IllFormed`, `NotFound`, `Duplicate`,
/// `BadPath`) are turned into response strings at the interpreter and never
/// unwind a session. `Internal` is the exception: a poisoned lock means some
/// other thread panicked while holding it, which this crate treats as fatal.
#[derive(Debug, Error)]
pub enum Error {
    #[error("field exceeds {MAX_FIELD_LEN} bytes")]
    TooLong,

    #[error("ill-formed command")]
    IllFormed,

    #[error("not found")]
    NotFound,

    #[error("already in database")]
    Duplicate,

    #[error("bad file name")]
    BadPath,

    #[error("transport closed")]
    Transport,

    #[error("internal lock or thread primitive failure: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
