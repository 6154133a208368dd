//! The ordered key/value index: a binary search tree of string keys, with a
//! permanent sentinel root and one readers-writer lock per node.
//!
//! Every operation descends hand-over-hand: a child's lock is always taken
//! before its parent's is released. In safe Rust this falls out of plain
//! recursion over `RwLockReadGuard`/`RwLockWriteGuard` values that live on
//! the call stack — a caller's guard simply isn't dropped until after the
//! callee has already locked the next node, and it drops automatically (via
//! `Drop`) on every return path, including the early ones. There is no path
//! through this module that can leak a lock.

mod node;

use std::io::{self, Write};
use std::sync::{RwLockReadGuard, RwLockWriteGuard};

use node::{dir_for, Dir, Node, NodeInner};

use crate::error::{Error, Result, MAX_FIELD_LEN};

/// Outcome of a successful `insert` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    Added,
    Duplicate,
}

/// Outcome of a successful `remove` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removed {
    Removed,
    NotFound,
}

/// A poisoned lock means some other thread panicked while holding it. The
/// index treats this the way the source treats a failed pthread primitive:
/// there is nothing sensible left to do, so the process goes down.
fn read_lock<'a>(node: &'a Node) -> RwLockReadGuard<'a, NodeInner> {
    node.inner.read().unwrap_or_else(|_| {
        log::error!("index: poisoned read lock, aborting");
        std::process::abort();
    })
}

fn write_lock<'a>(node: &'a Node) -> RwLockWriteGuard<'a, NodeInner> {
    node.inner.write().unwrap_or_else(|_| {
        log::error!("index: poisoned write lock, aborting");
        std::process::abort();
    })
}

fn check_field_lengths(key: &str, value: &str) -> Result<()> {
    if key.len() > MAX_FIELD_LEN || value.len() > MAX_FIELD_LEN {
        Err(Error::TooLong)
    } else {
        Ok(())
    }
}

/// The concurrent ordered index. Cloning an `Index` is not supported on
/// purpose: a server has exactly one, shared behind an `Arc` by its callers.
pub struct Index {
    root: std::sync::Arc<Node>,
}

impl Index {
    pub fn new() -> Self {
        Index { root: Node::sentinel() }
    }

    /// Returns a copy of the value stored at `key`, or `None`.
    pub fn lookup(&self, key: &str) -> Option<String> {
        let guard = read_lock(&self.root);
        lookup_at(guard, key)
    }

    /// Inserts `key` with `value` unless `key` is already present.
    pub fn insert(&self, key: &str, value: &str) -> Result<Inserted> {
        check_field_lengths(key, value)?;
        let guard = write_lock(&self.root);
        Ok(insert_at(guard, key, value))
    }

    /// Removes `key` if present.
    pub fn remove(&self, key: &str) -> Removed {
        let guard = write_lock(&self.root);
        remove_at(guard, key)
    }

    /// Writes a pre-order dump of the tree to `out`: one `<indent><key>
    /// <value>` line per node, the sentinel printed as `(root)`, and a
    /// missing child printed on its own line as `(null)`.
    pub fn snapshot(&self, out: &mut dyn Write) -> io::Result<()> {
        let guard = read_lock(&self.root);
        snapshot_at(guard, 0, true, out)
    }

    /// Detaches both of the sentinel's children so the recursive `Drop` of
    /// `Arc<Node>` frees every non-sentinel node. Only safe to call once the
    /// shutdown barrier has fired: no session may still be descending.
    pub fn destroy(&self) {
        let mut guard = write_lock(&self.root);
        guard.left = None;
        guard.right = None;
    }
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------
// Hand-over-hand descent helpers. Each function takes ownership of a lock
// already held on `node` and either resolves the operation locally or
// recurses into a child after locking it, dropping the parent's guard
// immediately afterward.
// ---------------------------------------------------------------------

fn lookup_at(guard: RwLockReadGuard<NodeInner>, key: &str) -> Option<String> {
    let dir = dir_for(key, &guard.key);
    let child = guard.child(dir);
    match child {
        None => None,
        Some(child_node) => {
            let child_guard = read_lock(&child_node);
            drop(guard);
            if child_guard.key == key {
                Some(child_guard.value.clone())
            } else {
                lookup_at(child_guard, key)
            }
        }
    }
}

fn insert_at(mut guard: RwLockWriteGuard<NodeInner>, key: &str, value: &str) -> Inserted {
    let dir = dir_for(key, &guard.key);
    let child = guard.child(dir);
    match child {
        None => {
            guard.set_child(dir, Some(Node::leaf(key.to_string(), value.to_string())));
            Inserted::Added
        }
        Some(child_node) => {
            let child_guard = write_lock(&child_node);
            if child_guard.key == key {
                Inserted::Duplicate
            } else {
                drop(guard);
                insert_at(child_guard, key, value)
            }
        }
    }
}

fn remove_at(mut guard: RwLockWriteGuard<NodeInner>, key: &str) -> Removed {
    let dir = dir_for(key, &guard.key);
    let child = guard.child(dir);
    let d_node = match child {
        None => return Removed::NotFound,
        Some(d_node) => d_node,
    };
    let mut d_guard = write_lock(&d_node);
    if d_guard.key != key {
        drop(guard);
        return remove_at(d_guard, key);
    }

    match (d_guard.left.is_some(), d_guard.right.is_some()) {
        (false, _) => {
            // No left child: `d.right` (possibly `None`, a leaf) replaces
            // `d` in the parent.
            let replacement = d_guard.right.take();
            guard.set_child(dir, replacement);
        }
        (true, false) => {
            // Left child only.
            let left = d_guard.left.take();
            guard.set_child(dir, left);
        }
        (true, true) => {
            // Case C: two children. Find the in-order successor by always
            // taking the left child of `d.right`, splice it out, and copy
            // its key/value into `d`. `d` itself stays locked throughout,
            // together with its own parent (`guard`), exactly as the
            // source holds both for the whole of this case.
            let right_node = d_guard.right.clone().unwrap();
            let right_guard = write_lock(&right_node);
            let (succ_key, succ_value) = if right_guard.left.is_none() {
                let succ_key = right_guard.key.clone();
                let succ_value = right_guard.value.clone();
                let new_right = right_guard.right.clone();
                drop(right_guard);
                d_guard.right = new_right;
                (succ_key, succ_value)
            } else {
                splice_successor(right_guard, Dir::Left)
            };
            d_guard.key = succ_key;
            d_guard.value = succ_value;
        }
    }
    Removed::Removed
}

/// Descends the left spine of `ancestor`'s `dir` child to find the in-order
/// successor, splices it out of the tree, and returns a copy of its key and
/// value. Operates entirely within the subtree below `d`; `d`'s own lock is
/// never touched here, which is what lets `remove_at` keep `d` locked for
/// the whole of case C without this helper needing to know about `d` at all.
fn splice_successor(
    mut ancestor_guard: RwLockWriteGuard<NodeInner>,
    dir: Dir,
) -> (String, String) {
    let current_node = ancestor_guard.child(dir).expect("successor descent off the tree");
    let current_guard = write_lock(&current_node);
    if current_guard.left.is_none() {
        let right = current_guard.right.clone();
        ancestor_guard.set_child(dir, right);
        drop(ancestor_guard);
        (current_guard.key.clone(), current_guard.value.clone())
    } else {
        drop(ancestor_guard);
        splice_successor(current_guard, Dir::Left)
    }
}

fn snapshot_at(
    guard: RwLockReadGuard<NodeInner>,
    depth: usize,
    is_sentinel: bool,
    out: &mut dyn Write,
) -> io::Result<()> {
    write_indent(depth, out)?;
    if is_sentinel {
        writeln!(out, "(root)")?;
    } else {
        writeln!(out, "{} {}", guard.key, guard.value)?;
    }

    let left = guard.left.clone();
    let right = guard.right.clone();
    print_child(left, depth + 1, out)?;
    print_child(right, depth + 1, out)?;
    drop(guard);
    Ok(())
}

fn print_child(
    child: Option<std::sync::Arc<Node>>,
    depth: usize,
    out: &mut dyn Write,
) -> io::Result<()> {
    match child {
        None => {
            write_indent(depth, out)?;
            writeln!(out, "(null)")
        }
        Some(child_node) => {
            let child_guard = read_lock(&child_node);
            snapshot_at(child_guard, depth, false, out)
        }
    }
}

fn write_indent(depth: usize, out: &mut dyn Write) -> io::Result<()> {
    for _ in 0..depth {
        write!(out, " ")?;
    }
    Ok(())
}
