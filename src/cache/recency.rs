//! Recency Index Module
//!
//! Tracks touch order of keys for LRU eviction.

use std::collections::HashMap;

/// Null link in the node arena.
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node {
    key: Vec<u8>,
    prev: usize,
    next: usize,
}

/// Handle to a list node whose index entry has been detached.
///
/// Only produced by [`RecencyIndex::detach`]; hand it back to
/// [`RecencyIndex::reattach`] or [`RecencyIndex::unlink`]. Not `Copy`:
/// both consume the handle, so a node is released at most once.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Slot(usize);

// == Recency Index ==
/// Doubly-linked recency list plus a key lookup map.
///
/// Nodes live in a `Vec` arena linked by index:
/// - Front (head) = Most recently touched
/// - Back (tail) = Least recently touched, next eviction candidate
///
/// Touch, remove, detach and unlink are all O(1).
#[derive(Debug)]
pub struct RecencyIndex {
    /// Key to arena position
    slots: HashMap<Vec<u8>, usize>,
    /// Node arena
    nodes: Vec<Node>,
    head: usize,
    tail: usize,
    /// Recycled arena positions
    free: Vec<usize>,
}

impl Default for RecencyIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl RecencyIndex {
    // == Constructor ==
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            nodes: Vec::new(),
            head: NIL,
            tail: NIL,
            free: Vec::new(),
        }
    }

    // == Touch ==
    /// Marks a key as most recently used.
    ///
    /// Known keys move to the front; new keys are inserted at the front.
    pub fn touch(&mut self, key: &[u8]) {
        if let Some(&idx) = self.slots.get(key) {
            if self.head != idx {
                self.unlink_node(idx);
                self.link_front(idx);
            }
            return;
        }
        let idx = self.alloc(key.to_vec());
        self.link_front(idx);
        self.slots.insert(key.to_vec(), idx);
    }

    // == Push Back ==
    /// Inserts an unknown key as the coldest entry.
    ///
    /// Returns false and leaves the order alone if the key is already tracked.
    pub fn push_back(&mut self, key: &[u8]) -> bool {
        if self.slots.contains_key(key) {
            return false;
        }
        let idx = self.alloc(key.to_vec());
        self.link_back(idx);
        self.slots.insert(key.to_vec(), idx);
        true
    }

    // == Remove ==
    /// Removes a key from the index. No-op if absent.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        match self.slots.remove(key) {
            Some(idx) => {
                self.unlink_node(idx);
                self.release(idx);
                true
            }
            None => false,
        }
    }

    // == Peek Coldest ==
    /// Returns up to `n` keys, coldest first, without changing the order.
    pub fn peek_coldest(&self, n: usize) -> Vec<Vec<u8>> {
        self.iter_coldest().take(n).map(<[u8]>::to_vec).collect()
    }

    /// Returns the least recently used key.
    pub fn peek_oldest(&self) -> Option<&[u8]> {
        self.iter_coldest().next()
    }

    // == Staged Removal ==
    /// Drops the lookup entry for `key` but leaves its node linked.
    ///
    /// Until the returned slot is reattached or unlinked, the key is not
    /// reported by `contains` or `len`, and `touch` would create a second
    /// node for it. Callers must hold exclusive access for the whole
    /// detach..unlink span.
    pub(crate) fn detach(&mut self, key: &[u8]) -> Option<Slot> {
        self.slots.remove(key).map(Slot)
    }

    /// Restores a lookup entry removed by `detach`; the node keeps its
    /// original position.
    pub(crate) fn reattach(&mut self, slot: Slot) {
        let key = self.nodes[slot.0].key.clone();
        self.slots.insert(key, slot.0);
    }

    /// Removes a detached node from the list and frees it.
    pub(crate) fn unlink(&mut self, slot: Slot) {
        self.unlink_node(slot.0);
        self.release(slot.0);
    }

    // == Iteration ==
    /// Keys from most to least recently used.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        Walk {
            nodes: &self.nodes,
            current: self.head,
            forward: true,
        }
    }

    /// Keys from least to most recently used.
    pub fn iter_coldest(&self) -> impl Iterator<Item = &[u8]> + '_ {
        Walk {
            nodes: &self.nodes,
            current: self.tail,
            forward: false,
        }
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &[u8]) -> bool {
        self.slots.contains_key(key)
    }

    // --- arena plumbing ---

    fn alloc(&mut self, key: Vec<u8>) -> usize {
        let node = Node {
            key,
            prev: NIL,
            next: NIL,
        };
        match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = node;
                idx
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, idx: usize) {
        self.nodes[idx].key = Vec::new();
        self.free.push(idx);
    }

    fn link_front(&mut self, idx: usize) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn link_back(&mut self, idx: usize) {
        self.nodes[idx].next = NIL;
        self.nodes[idx].prev = self.tail;
        if self.tail != NIL {
            self.nodes[self.tail].next = idx;
        }
        self.tail = idx;
        if self.head == NIL {
            self.head = idx;
        }
    }

    fn unlink_node(&mut self, idx: usize) {
        let Node { prev, next, .. } = self.nodes[idx];
        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = NIL;
    }
}

struct Walk<'a> {
    nodes: &'a [Node],
    current: usize,
    forward: bool,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == NIL {
            return None;
        }
        let node = &self.nodes[self.current];
        self.current = if self.forward { node.next } else { node.prev };
        Some(node.key.as_slice())
    }
}
