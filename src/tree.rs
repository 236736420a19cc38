//! Hierarchical index over the loaded dataset.
//!
//! Nodes live in a flat `Vec` indexed by [`NodeId`], with intrusive
//! first-child/next-sibling links forming the tree. The index is rebuilt
//! from the dataset on every load and never mutated independently,
//! with one cosmetic exception: [`SignalTree::add_custom_nodes`] appends
//! display nodes for freshly loaded script functions without a full
//! rebuild.
//!
//! Construction and filtering both walk with explicit work stacks; child
//! order follows the dataset's key order, which the decoder already made
//! deterministic.

use crate::types::{Dataset, Value};
use regex::Regex;
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Delay between the last keystroke and the filter application
pub const FILTER_DEBOUNCE: Duration = Duration::from_millis(200);

/// Index of a node in the tree's flat storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const INVALID: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A single node of the signal tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: NodeId,
    /// Key segment this node represents (display text)
    pub name: String,
    /// Parent node (INVALID for roots)
    pub parent: NodeId,
    /// First child (intrusive linked list)
    pub first_child: NodeId,
    /// Next sibling (intrusive linked list)
    pub next_sibling: NodeId,
    /// Depth in the tree (0 for roots)
    pub depth: u16,
    /// True when the node has no children (a concrete signal)
    pub is_leaf: bool,
}

/// Flat-storage hierarchical index over the dataset's keys
#[derive(Debug, Default)]
pub struct SignalTree {
    nodes: Vec<TreeNode>,
}

impl SignalTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index for a dataset with an explicit work-list
    pub fn build(data: &Dataset) -> Self {
        let mut tree = Self::new();
        let mut stack: Vec<(NodeId, &Value)> = Vec::new();

        for (name, value) in data {
            let id = tree.add_root(name.clone());
            if value.has_children() {
                stack.push((id, value));
            }
        }

        while let Some((parent, value)) = stack.pop() {
            match value {
                Value::Struct(fields) => {
                    for (name, child_value) in fields {
                        let id = tree.add_child(parent, name.clone());
                        if child_value.has_children() {
                            stack.push((id, child_value));
                        }
                    }
                }
                Value::List(elements) => {
                    for (index, element) in elements.iter().enumerate() {
                        let id = tree.add_child(parent, format!("[{}]", index));
                        if element.has_children() {
                            stack.push((id, element));
                        }
                    }
                }
                _ => {}
            }
        }

        tree
    }

    /// Total number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node by id (O(1) array index)
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        if id.is_valid() {
            self.nodes.get(id.index())
        } else {
            None
        }
    }

    /// Add a root node
    pub fn add_root(&mut self, name: String) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TreeNode {
            id,
            name,
            parent: NodeId::INVALID,
            first_child: NodeId::INVALID,
            next_sibling: NodeId::INVALID,
            depth: 0,
            is_leaf: true,
        });
        self.link_sibling_root(id);
        id
    }

    /// Add a child under `parent`, appending to its sibling chain
    pub fn add_child(&mut self, parent: NodeId, name: String) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let depth = self.nodes[parent.index()].depth + 1;
        self.nodes.push(TreeNode {
            id,
            name,
            parent,
            first_child: NodeId::INVALID,
            next_sibling: NodeId::INVALID,
            depth,
            is_leaf: true,
        });

        let first = self.nodes[parent.index()].first_child;
        if !first.is_valid() {
            self.nodes[parent.index()].first_child = id;
        } else {
            let mut cursor = first;
            loop {
                let next = self.nodes[cursor.index()].next_sibling;
                if !next.is_valid() {
                    self.nodes[cursor.index()].next_sibling = id;
                    break;
                }
                cursor = next;
            }
        }
        self.nodes[parent.index()].is_leaf = false;
        id
    }

    /// Link a newly added root into the root sibling chain
    fn link_sibling_root(&mut self, id: NodeId) {
        let mut last_root = NodeId::INVALID;
        for node in &self.nodes {
            if !node.parent.is_valid() && node.id != id {
                last_root = node.id;
            }
        }
        if last_root.is_valid() {
            self.nodes[last_root.index()].next_sibling = id;
        }
    }

    /// Iterate over root nodes in insertion order
    pub fn roots(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter().filter(|n| !n.parent.is_valid())
    }

    /// Iterate over the children of `parent`
    pub fn children(&self, parent: NodeId) -> ChildIter<'_> {
        let first = self
            .get(parent)
            .map(|n| n.first_child)
            .unwrap_or(NodeId::INVALID);
        ChildIter {
            tree: self,
            current: first,
        }
    }

    /// Resolve a key path to the node it addresses
    pub fn path_to_node(&self, path: &[String]) -> Option<NodeId> {
        let (first, rest) = path.split_first()?;
        let mut current = self.roots().find(|n| &n.name == first)?.id;
        for segment in rest {
            current = self.children(current).find(|n| &n.name == segment)?.id;
        }
        Some(current)
    }

    /// Reconstruct the key path addressing `id`
    pub fn node_to_path(&self, id: NodeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(node) = self.get(current) {
            path.push(node.name.clone());
            current = node.parent;
        }
        path.reverse();
        path
    }

    /// Append display nodes for custom functions under `group`.
    ///
    /// Creates the group root if absent and skips names already present;
    /// purely cosmetic; selection still resolves against the dataset.
    pub fn add_custom_nodes(&mut self, group: &str, names: &[String]) {
        let existing = self.roots().find(|n| n.name == group).map(|n| n.id);
        let group_id = match existing {
            Some(id) => id,
            None => self.add_root(group.to_string()),
        };
        for name in names {
            if self.children(group_id).any(|n| &n.name == name) {
                continue;
            }
            self.add_child(group_id, name.clone());
        }
    }

    /// Nodes visible under `pattern`: a node is visible iff it or any of
    /// its descendants matches, which keeps ancestor chains of every
    /// match. `*` matches any substring; matching is case-insensitive
    /// substring matching. Empty patterns mean "no filter" (`None`).
    pub fn filter(&self, pattern: &str) -> Option<HashSet<NodeId>> {
        let regex = wildcard_to_regex(pattern)?;

        let mut visible = HashSet::new();
        for node in &self.nodes {
            if !regex.is_match(&node.name) {
                continue;
            }
            // The match and its whole ancestor chain become visible
            let mut current = node.id;
            while current.is_valid() && visible.insert(current) {
                current = self.nodes[current.index()].parent;
            }
            // Everything below a matching node stays reachable
            let mut stack: Vec<NodeId> = self.children(node.id).map(|n| n.id).collect();
            while let Some(id) = stack.pop() {
                if visible.insert(id) {
                    stack.extend(self.children(id).map(|n| n.id));
                }
            }
        }
        Some(visible)
    }
}

/// Translate a `*`-wildcard pattern into a case-insensitive regex.
///
/// Returns `None` for empty/whitespace patterns (no filtering).
fn wildcard_to_regex(pattern: &str) -> Option<Regex> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return None;
    }
    let translated = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(?i){}", translated)).ok()
}

/// Iterator over the children of a node
pub struct ChildIter<'a> {
    tree: &'a SignalTree,
    current: NodeId,
}

impl<'a> Iterator for ChildIter<'a> {
    type Item = &'a TreeNode;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.current.is_valid() {
            return None;
        }
        let node = &self.tree.nodes[self.current.index()];
        self.current = node.next_sibling;
        Some(node)
    }
}

/// Trailing-edge debouncer for the tree's free-text filter.
///
/// Every submission cancels the previous pending one and restarts the
/// delay; only once the delay elapses without a newer submission does
/// [`FilterDebouncer::poll`] release the text. At most one application is
/// ever pending.
#[derive(Debug)]
pub struct FilterDebouncer {
    delay: Duration,
    pending: Option<(String, Instant)>,
}

impl Default for FilterDebouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterDebouncer {
    pub fn new() -> Self {
        Self::with_delay(FILTER_DEBOUNCE)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Register a keystroke: (re)start the delay for `text`
    pub fn submit(&mut self, text: impl Into<String>, now: Instant) {
        self.pending = Some((text.into(), now + self.delay));
    }

    /// Release the pending text once its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => {
                self.pending.take().map(|(text, _)| text)
            }
            _ => None,
        }
    }

    /// True while a filter application is pending
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
