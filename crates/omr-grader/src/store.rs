use crate::AnswerKey;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Faults the grader surfaces to callers. Comparison errors cannot occur:
/// all grader inputs are well-typed by construction.
#[derive(thiserror::Error, Debug)]
pub enum GraderError {
    #[error("no answer key found for exam code {0}")]
    KeyNotFound(String),
}

/// Answer-key storage collaborator the grader consumes. Implementations
/// backing this trait with a database are out of scope; this crate ships
/// only the bounded in-memory cache.
pub trait AnswerKeyStore {
    fn get_key(&self, exam_code: &str) -> Option<AnswerKey>;
    fn put_key(&self, exam_code: &str, key: AnswerKey);
}

/// Read-mostly `exam_code -> AnswerKey` cache with least-recently-used
/// eviction (default capacity 100). Readers observe a consistent snapshot
/// per call; writes happen only on key upload.
pub struct InMemoryAnswerKeyStore {
    cache: Mutex<LruCache<String, AnswerKey>>,
}

impl InMemoryAnswerKeyStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(100).unwrap());
        Self { cache: Mutex::new(LruCache::new(capacity)) }
    }
}

impl Default for InMemoryAnswerKeyStore {
    fn default() -> Self {
        Self::new(100)
    }
}

impl AnswerKeyStore for InMemoryAnswerKeyStore {
    fn get_key(&self, exam_code: &str) -> Option<AnswerKey> {
        let mut cache = self.cache.lock().expect("answer-key cache mutex poisoned");
        cache.get(exam_code).cloned()
    }

    fn put_key(&self, exam_code: &str, key: AnswerKey) {
        let mut cache = self.cache.lock().expect("answer-key cache mutex poisoned");
        cache.put(exam_code.to_string(), key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: &str) -> AnswerKey {
        AnswerKey { exam_code: code.to_string(), p1: vec![], p2: vec![], p3: vec![] }
    }

    #[test]
    fn put_then_get_round_trips() {
        let store = InMemoryAnswerKeyStore::new(2);
        store.put_key("0001", key("0001"));
        let fetched = store.get_key("0001").expect("present");
        assert_eq!(fetched.exam_code, "0001");
    }

    #[test]
    fn capacity_bound_evicts_least_recently_used() {
        let store = InMemoryAnswerKeyStore::new(2);
        store.put_key("a", key("a"));
        store.put_key("b", key("b"));
        store.put_key("c", key("c")); // evicts "a"
        assert!(store.get_key("a").is_none());
        assert!(store.get_key("b").is_some());
        assert!(store.get_key("c").is_some());
    }

    #[test]
    fn missing_key_is_none() {
        let store = InMemoryAnswerKeyStore::default();
        assert!(store.get_key("9999").is_none());
    }
}
