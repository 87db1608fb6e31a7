#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use memoizer::{
    BackendError, BackendResult, CacheBackend, LocalMemoryBackend, MemoizeConfig, Memoizer,
    Timeout,
};
use parking_lot::Mutex;

/// One operation seen by a [`FailingBackend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Get(String),
    Set(String, Timeout),
    Add(String),
    Delete(String),
    Clear,
}

/// A local-memory backend whose operations can be switched to fail, and which
/// records every call it receives.
#[derive(Debug, Default)]
pub struct FailingBackend {
    inner: LocalMemoryBackend,
    fail_get: AtomicBool,
    fail_set: AtomicBool,
    fail_delete: AtomicBool,
    ops: Mutex<Vec<Op>>,
}

impl FailingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_set(&self, fail: bool) {
        self.fail_set.store(fail, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn ops(&self) -> Vec<Op> {
        self.ops.lock().clone()
    }

    pub fn clear_ops(&self) {
        self.ops.lock().clear();
    }

    /// Keys of every `get` seen so far, in order.
    pub fn gets(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Get(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    /// Keys and timeouts of every `set` seen so far, in order.
    pub fn sets(&self) -> Vec<(String, Timeout)> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Set(key, timeout) => Some((key, timeout)),
                _ => None,
            })
            .collect()
    }

    /// Reads a raw entry, bypassing fault injection and the op log.
    pub fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.get(key).ok().flatten()
    }

    fn record(&self, op: Op) {
        self.ops.lock().push(op);
    }
}

impl CacheBackend for FailingBackend {
    fn get(&self, key: &str) -> BackendResult<Option<Vec<u8>>> {
        self.record(Op::Get(key.to_string()));
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(BackendError::new("injected get failure"));
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>, timeout: Timeout) -> BackendResult<()> {
        self.record(Op::Set(key.to_string(), timeout));
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(BackendError::new("injected set failure"));
        }
        self.inner.set(key, value, timeout)
    }

    fn add(&self, key: &str, value: Vec<u8>, timeout: Timeout) -> BackendResult<bool> {
        self.record(Op::Add(key.to_string()));
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(BackendError::new("injected add failure"));
        }
        self.inner.add(key, value, timeout)
    }

    fn delete(&self, key: &str) -> BackendResult<()> {
        self.record(Op::Delete(key.to_string()));
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(BackendError::new("injected delete failure"));
        }
        self.inner.delete(key)
    }

    fn clear(&self) -> BackendResult<()> {
        self.record(Op::Clear);
        self.inner.clear()
    }
}

/// A memoizer over a fresh [`FailingBackend`].
pub fn failing_memoizer(debug: bool) -> (Memoizer, Arc<FailingBackend>) {
    let backend = FailingBackend::new();
    let memoizer = Memoizer::new(backend.clone(), MemoizeConfig::default().with_debug(debug));
    (memoizer, backend)
}

/// A memoizer over a fresh [`LocalMemoryBackend`].
pub fn local_memoizer() -> Memoizer {
    Memoizer::new(Arc::new(LocalMemoryBackend::new()), MemoizeConfig::default())
}
