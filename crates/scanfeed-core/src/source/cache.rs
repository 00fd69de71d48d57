// Bounded audio cache in front of any call source.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use super::{Activity, CallSource};
use crate::error::CoreError;
use crate::model::{AudioClip, Call, System, Talkgroup};

pub const DEFAULT_CACHE_ENTRIES: usize = 50;

/// Clips larger than this are returned but never cached (10 MiB).
pub const DEFAULT_MAX_CLIP_BYTES: usize = 10 * 1024 * 1024;

/// Insertion-ordered clip cache. When full, the oldest inserted clip is
/// evicted; hits do not refresh an entry's position.
#[derive(Debug)]
pub struct AudioCache {
    entries: IndexMap<String, AudioClip>,
    capacity: usize,
    max_clip_bytes: usize,
}

impl Default for AudioCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_ENTRIES, DEFAULT_MAX_CLIP_BYTES)
    }
}

impl AudioCache {
    pub fn new(capacity: usize, max_clip_bytes: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
            capacity,
            max_clip_bytes,
        }
    }

    pub fn get(&self, call_id: &str) -> Option<AudioClip> {
        self.entries.get(call_id).cloned()
    }

    pub fn contains(&self, call_id: &str) -> bool {
        self.entries.contains_key(call_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store a clip. Returns `false` if it was too large to cache.
    pub fn insert(&mut self, call_id: &str, clip: AudioClip) -> bool {
        if self.capacity == 0 || clip.len() > self.max_clip_bytes {
            return false;
        }
        if let Some(existing) = self.entries.get_mut(call_id) {
            *existing = clip;
            return true;
        }
        while self.entries.len() >= self.capacity {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                debug!(call_id = %evicted, "evicted cached audio");
            }
        }
        self.entries.insert(call_id.to_owned(), clip);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Wraps a source so repeated audio fetches are served from memory.
pub struct CachedSource {
    inner: Arc<dyn CallSource>,
    cache: Mutex<AudioCache>,
}

impl CachedSource {
    pub fn new(inner: Arc<dyn CallSource>) -> Self {
        Self::with_cache(inner, AudioCache::default())
    }

    pub fn with_cache(inner: Arc<dyn CallSource>, cache: AudioCache) -> Self {
        Self {
            inner,
            cache: Mutex::new(cache),
        }
    }

    pub async fn cached_clips(&self) -> usize {
        self.cache.lock().await.len()
    }
}

#[async_trait]
impl CallSource for CachedSource {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn activity(&self) -> Activity {
        self.inner.activity()
    }

    async fn fetch_systems(&self) -> Result<Vec<System>, CoreError> {
        self.inner.fetch_systems().await
    }

    async fn fetch_talkgroups(&self, system_id: &str) -> Result<Vec<Talkgroup>, CoreError> {
        self.inner.fetch_talkgroups(system_id).await
    }

    async fn fetch_active_calls(&self) -> Result<Vec<Call>, CoreError> {
        self.inner.fetch_active_calls().await
    }

    async fn fetch_recent_calls(&self, limit: usize) -> Result<Vec<Call>, CoreError> {
        self.inner.fetch_recent_calls(limit).await
    }

    async fn fetch_audio(&self, call_id: &str) -> Result<Option<AudioClip>, CoreError> {
        if let Some(clip) = self.cache.lock().await.get(call_id) {
            debug!(call_id, "audio cache hit");
            return Ok(Some(clip));
        }

        let clip = self.inner.fetch_audio(call_id).await?;
        if let Some(ref clip) = clip {
            if !self.cache.lock().await.insert(call_id, clip.clone()) {
                debug!(call_id, bytes = clip.len(), "audio clip too large to cache");
            }
        }
        Ok(clip)
    }

    fn push_endpoint(&self) -> Option<Url> {
        self.inner.push_endpoint()
    }

    fn audio_url(&self, call_id: &str) -> Option<Url> {
        self.inner.audio_url(call_id)
    }

    async fn close(&self) {
        self.cache.lock().await.clear();
        self.inner.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn clip(size: usize) -> AudioClip {
        AudioClip {
            data: Bytes::from(vec![0_u8; size]),
            content_type: "audio/mpeg".into(),
            filename: None,
        }
    }

    #[test]
    fn fifty_first_insert_evicts_exactly_the_first() {
        let mut cache = AudioCache::default();
        for i in 0..50 {
            assert!(cache.insert(&format!("call-{i}"), clip(8)));
        }
        assert_eq!(cache.len(), 50);

        cache.insert("call-50", clip(8));

        assert_eq!(cache.len(), 50);
        assert!(!cache.contains("call-0"));
        for i in 1..=50 {
            assert!(cache.contains(&format!("call-{i}")), "call-{i} missing");
        }
    }

    #[test]
    fn hits_do_not_refresh_position() {
        let mut cache = AudioCache::new(2, 1024);
        cache.insert("a", clip(1));
        cache.insert("b", clip(1));
        assert!(cache.get("a").is_some());
        cache.insert("a", clip(2));

        cache.insert("c", clip(1));
        assert!(!cache.contains("a"));
        assert!(cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn oversized_clips_are_not_cached() {
        let mut cache = AudioCache::new(4, 16);
        assert!(!cache.insert("big", clip(17)));
        assert!(cache.is_empty());
        assert!(cache.insert("ok", clip(16)));
    }
}
