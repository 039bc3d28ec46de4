//! Environment for variable bindings.
//!
//! A [`Frame`] is one level of scope: an open-hashing table from symbol text to
//! value. Keys compare case-insensitively. The table starts with
//! [`INITIAL_BUCKETS`] buckets and, whenever an insert would push occupancy to
//! one half or more, grows to `2 * size + 1` buckets and redistributes every
//! entry.
//!
//! An [`Environment`] is the chain of frames visible to the evaluator. Calls
//! link their frame to the frame active at the call site, and frames are
//! created and released in strict LIFO order, so the chain is kept as a stack:
//! the global frame sits at the bottom and the parent of every frame is the
//! one below it. [`Environment::enter_frame`] hands out a guard that releases
//! the call frame when dropped, on every exit path.

use std::ops::{Deref, DerefMut};

use crate::MAX_EVAL_DEPTH;
use crate::ast::Value;

/// Number of buckets a fresh frame starts with
pub const INITIAL_BUCKETS: usize = 16;

#[derive(Debug, Clone)]
struct Entry<'src> {
    hash: u64,
    key: &'src str,
    value: Value<'src>,
}

/// One scope level: a resizable hash table of bindings
#[derive(Debug, Clone)]
pub struct Frame<'src> {
    buckets: Vec<Vec<Entry<'src>>>,
    len: usize,
}

/// Rolling shift-and-add hash over the key's bytes, ASCII case folded so that
/// keys differing only in case land in the same bucket.
fn hash_key(key: &str) -> u64 {
    key.bytes().fold(0u64, |hash, byte| {
        (hash << 1).wrapping_add(u64::from(byte.to_ascii_lowercase()).wrapping_mul(131))
    })
}

fn bucket_index(hash: u64, bucket_count: usize) -> usize {
    // The remainder is below bucket_count, so it fits in usize
    (hash % bucket_count as u64) as usize
}

impl<'src> Frame<'src> {
    pub fn new() -> Self {
        Frame {
            buckets: vec![Vec::new(); INITIAL_BUCKETS],
            len: 0,
        }
    }

    /// Number of bindings in this frame
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Insert or overwrite the binding for `key` in this frame only
    pub fn add(&mut self, key: &'src str, value: Value<'src>) {
        if self.len * 2 >= self.buckets.len() {
            self.grow();
        }

        let hash = hash_key(key);
        let index = bucket_index(hash, self.buckets.len());
        let bucket = &mut self.buckets[index];
        match bucket
            .iter_mut()
            .find(|entry| entry.hash == hash && entry.key.eq_ignore_ascii_case(key))
        {
            Some(entry) => entry.value = value,
            None => {
                bucket.push(Entry { hash, key, value });
                self.len += 1;
            }
        }
    }

    /// Look `key` up in this frame only
    pub fn lookup(&self, key: &str) -> Option<&Value<'src>> {
        let hash = hash_key(key);
        self.buckets[bucket_index(hash, self.buckets.len())]
            .iter()
            .find(|entry| entry.hash == hash && entry.key.eq_ignore_ascii_case(key))
            .map(|entry| &entry.value)
    }

    fn grow(&mut self) {
        let new_count = self.buckets.len() * 2 + 1;
        tracing::trace!(
            from = self.buckets.len(),
            to = new_count,
            entries = self.len,
            "resizing frame"
        );

        let old = std::mem::replace(&mut self.buckets, vec![Vec::new(); new_count]);
        for entry in old.into_iter().flatten() {
            let index = bucket_index(entry.hash, new_count);
            self.buckets[index].push(entry);
        }
    }
}

impl Default for Frame<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// The chain of frames visible to the evaluator, innermost last
#[derive(Debug, Clone)]
pub struct Environment<'src> {
    frames: Vec<Frame<'src>>,
    max_depth: usize,
}

impl<'src> Environment<'src> {
    /// An environment holding only an empty global frame
    pub fn new() -> Self {
        Environment {
            frames: vec![Frame::new()],
            max_depth: MAX_EVAL_DEPTH,
        }
    }

    /// Override the evaluation depth limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Bind `name` in the innermost frame
    pub fn define(&mut self, name: &'src str, value: Value<'src>) {
        self.current_mut().add(name, value);
    }

    /// Resolve `name` by walking from the innermost frame out to the global one
    pub fn get(&self, name: &str) -> Option<&Value<'src>> {
        self.frames.iter().rev().find_map(|frame| frame.lookup(name))
    }

    // The global frame is never popped, so `frames` is never empty
    fn current_mut(&mut self) -> &mut Frame<'src> {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Number of frames on the chain, the global frame included
    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    /// Push a new frame whose parent is the currently active one.
    ///
    /// The frame is popped when the returned guard is dropped.
    pub fn enter_frame(&mut self) -> CallFrame<'_, 'src> {
        self.frames.push(Frame::new());
        CallFrame { env: self }
    }

    fn pop_frame(&mut self) {
        debug_assert!(self.frames.len() > 1, "the global frame is never popped");
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }
}

impl Default for Environment<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard for a call frame.
///
/// Derefs to the [`Environment`]; dropping it pops the frame and makes the
/// caller's frame active again.
pub struct CallFrame<'env, 'src> {
    env: &'env mut Environment<'src>,
}

impl Drop for CallFrame<'_, '_> {
    fn drop(&mut self) {
        self.env.pop_frame();
    }
}

impl<'src> Deref for CallFrame<'_, 'src> {
    type Target = Environment<'src>;

    fn deref(&self) -> &Self::Target {
        self.env
    }
}

impl DerefMut for CallFrame<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::val;

    #[test]
    fn test_add_and_lookup() {
        let mut frame = Frame::new();
        assert!(frame.is_empty());
        frame.add("x", val(1));
        frame.add("y", val(2));

        assert_eq!(frame.lookup("x"), Some(&val(1)));
        assert_eq!(frame.lookup("y"), Some(&val(2)));
        assert_eq!(frame.lookup("z"), None);
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let mut frame = Frame::new();
        frame.add("x", val(1));
        frame.add("x", val(2));
        assert_eq!(frame.lookup("x"), Some(&val(2)));
        assert_eq!(frame.len(), 1);
    }

    #[test]
    fn test_keys_are_case_insensitive() {
        let mut frame = Frame::new();
        frame.add("Counter", val(1));
        assert_eq!(frame.lookup("counter"), Some(&val(1)));
        assert_eq!(frame.lookup("COUNTER"), Some(&val(1)));

        frame.add("COUNTER", val(5));
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.lookup("counter"), Some(&val(5)));
    }

    #[test]
    fn test_hash_is_deterministic_and_case_folded() {
        assert_eq!(hash_key("lambda"), hash_key("lambda"));
        assert_eq!(hash_key("lambda"), hash_key("LaMbDa"));
        assert_ne!(hash_key("ab"), hash_key("ba"));
        assert_eq!(hash_key(""), 0);
    }

    #[test]
    fn test_resize_preserves_every_binding() {
        let names: Vec<String> = (0..500).map(|i| format!("name-{i}")).collect();
        let mut frame = Frame::new();
        let mut resizes = 0;

        for (i, name) in names.iter().enumerate() {
            let before = frame.bucket_count();
            frame.add(name, val(i as i64));
            if frame.bucket_count() != before {
                resizes += 1;
                assert_eq!(frame.bucket_count(), before * 2 + 1);
            }
            // Occupancy stays at or below one half
            assert!(frame.len() * 2 <= frame.bucket_count() + 1);
        }

        assert!(resizes >= 4, "only {resizes} resizes");
        assert_eq!(frame.len(), names.len());
        for (i, name) in names.iter().enumerate() {
            assert_eq!(frame.lookup(name), Some(&val(i as i64)), "{name}");
        }
    }

    #[test]
    fn test_growth_sequence() {
        let mut frame = Frame::new();
        let names = ["a", "b", "c", "d", "e", "f", "g", "h", "i"];
        for name in &names[..8] {
            frame.add(name, val(0));
        }
        assert_eq!(frame.bucket_count(), INITIAL_BUCKETS);

        // The ninth insert sees 8 * 2 >= 16 and grows first
        frame.add(names[8], val(0));
        assert_eq!(frame.bucket_count(), 33);
    }

    #[test]
    fn test_chain_shadowing_and_restore() {
        let mut env = Environment::new();
        env.define("x", val(10));
        assert_eq!(env.frame_depth(), 1);

        {
            let mut frame = env.enter_frame();
            assert_eq!(frame.frame_depth(), 2);
            // Visible from the inner frame through the parent
            assert_eq!(frame.get("x"), Some(&val(10)));

            frame.define("x", val(5));
            frame.define("y", val(6));
            assert_eq!(frame.get("x"), Some(&val(5)));
            assert_eq!(frame.get("y"), Some(&val(6)));
        }

        assert_eq!(env.frame_depth(), 1);
        // Shadowing never wrote into the parent
        assert_eq!(env.get("x"), Some(&val(10)));
        assert_eq!(env.get("y"), None);
    }

    #[test]
    fn test_nested_frames_resolve_innermost_first() {
        let mut env = Environment::new();
        env.define("a", val(1));
        let mut outer = env.enter_frame();
        outer.define("b", val(2));
        let mut inner = outer.enter_frame();
        inner.define("a", val(3));

        assert_eq!(inner.get("a"), Some(&val(3)));
        assert_eq!(inner.get("b"), Some(&val(2)));
        assert_eq!(inner.frame_depth(), 3);
        drop(inner);
        assert_eq!(outer.get("a"), Some(&val(1)));
    }
}
