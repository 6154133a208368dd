use std::sync::{Arc, RwLock};

/// Which side of a node a key falls on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(super) enum Dir {
    Left,
    Right,
}

/// The mutable contents of a node, guarded by `Node::inner`.
///
/// `key` is only ever reassigned by the case-C delete overwrite in
/// `Index::remove`; everywhere else a node's key is fixed for its lifetime.
pub(super) struct NodeInner {
    pub key: String,
    pub value: String,
    pub left: Option<Arc<Node>>,
    pub right: Option<Arc<Node>>,
}

impl NodeInner {
    pub fn child(&self, dir: Dir) -> Option<Arc<Node>> {
        match dir {
            Dir::Left => self.left.clone(),
            Dir::Right => self.right.clone(),
        }
    }

    pub fn set_child(&mut self, dir: Dir, node: Option<Arc<Node>>) {
        match dir {
            Dir::Left => self.left = node,
            Dir::Right => self.right = node,
        }
    }
}

/// One entry in the tree. Every node, including the sentinel, owns an
/// `RwLock` that guards its key, value and both child links together.
pub(super) struct Node {
    pub inner: RwLock<NodeInner>,
}

impl Node {
    pub fn leaf(key: String, value: String) -> Arc<Node> {
        Arc::new(Node {
            inner: RwLock::new(NodeInner {
                key,
                value,
                left: None,
                right: None,
            }),
        })
    }

    /// The permanent sentinel: empty key, sorts before every real key.
    pub fn sentinel() -> Arc<Node> {
        Node::leaf(String::new(), String::new())
    }
}

/// Chooses which side of `key_at_node` a `target` key descends to.
pub(super) fn dir_for(target: &str, key_at_node: &str) -> Dir {
    if target < key_at_node {
        Dir::Left
    } else {
        Dir::Right
    }
}
