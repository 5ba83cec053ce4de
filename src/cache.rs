//! In-memory cache of resolved synthesis results.
//!
//! Entries are keyed by [`RequestFingerprint`] and live until the process
//! exits. There is no TTL, size bound or eviction: replaying any phrase
//! synthesized earlier in the session must reuse its audio and timings, and
//! memory grows with the number of distinct requests.

use crate::fingerprint::RequestFingerprint;
use crate::timing::WordTiming;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Shared, immutable audio bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioHandle(Arc<[u8]>);

impl AudioHandle {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &AudioHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Writes the raw bytes to `path` unchanged.
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, &self.0)
    }
}

impl AsRef<[u8]> for AudioHandle {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Audio plus the provider's word timings (empty when none were sent).
#[derive(Debug)]
pub struct CacheEntry {
    pub audio: AudioHandle,
    pub timings: Arc<[WordTiming]>,
}

impl CacheEntry {
    pub fn new(audio: Vec<u8>, timings: Vec<WordTiming>) -> Self {
        Self {
            audio: AudioHandle::new(audio),
            timings: timings.into(),
        }
    }

    pub fn has_word_timings(&self) -> bool {
        !self.timings.is_empty()
    }
}

#[derive(Default)]
pub struct ResponseCache {
    entries: HashMap<RequestFingerprint, Arc<CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fingerprint: &RequestFingerprint) -> Option<Arc<CacheEntry>> {
        self.entries.get(fingerprint).cloned()
    }

    /// Inserts an entry and returns the one now stored under `fingerprint`.
    ///
    /// An existing entry is never replaced.
    pub fn put(&mut self, fingerprint: RequestFingerprint, entry: CacheEntry) -> Arc<CacheEntry> {
        if let Some(existing) = self.entries.get(&fingerprint) {
            tracing::debug!(%fingerprint, "Cache entry already present, keeping the first one");
            return existing.clone();
        }
        let entry = Arc::new(entry);
        self.entries.insert(fingerprint, entry.clone());
        tracing::debug!(entries = self.entries.len(), "Cached synthesis result");
        entry
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::SynthesisRequest;
    use crate::timing::TimingInterval;

    fn key(text: &str) -> RequestFingerprint {
        SynthesisRequest::new(text, "azure", "en-US", "en-US-JennyNeural").fingerprint()
    }

    #[test]
    fn test_get_returns_shared_entry() {
        let mut cache = ResponseCache::new();
        assert!(cache.get(&key("Hello")).is_none());

        let stored = cache.put(
            key("Hello"),
            CacheEntry::new(vec![1, 2, 3], vec![TimingInterval::new("Hello", 0.0, 0.4)]),
        );
        let first = cache.get(&key("Hello")).unwrap();
        let second = cache.get(&key("Hello")).unwrap();

        assert!(Arc::ptr_eq(&stored, &first));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.has_word_timings());
        assert_eq!(first.audio.bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_put_is_idempotent() {
        let mut cache = ResponseCache::new();
        let first = cache.put(key("Hello"), CacheEntry::new(vec![1], Vec::new()));
        let second = cache.put(key("Hello"), CacheEntry::new(vec![2], Vec::new()));

        assert_eq!(cache.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.audio.bytes(), &[1]);
    }

    #[test]
    fn test_entries_accumulate_without_eviction() {
        let mut cache = ResponseCache::new();
        for i in 0..500 {
            cache.put(key(&format!("phrase {}", i)), CacheEntry::new(vec![i as u8], Vec::new()));
        }
        assert_eq!(cache.len(), 500);
        assert_eq!(cache.get(&key("phrase 0")).unwrap().audio.bytes(), &[0]);
    }

    #[test]
    fn test_save_writes_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speech.mp3");
        let audio = AudioHandle::new(vec![0xFF, 0xFB, 0x00, 0x80]);

        audio.save(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xFF, 0xFB, 0x00, 0x80]);
    }
}
