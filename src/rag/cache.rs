//! Memoized completions keyed by exact prompt text.
//!
//! Prompts are cut to the model's input budget first; the key is the prompt
//! the model actually sees.
//!
//! The entry table is an LRU bounded by `capacity`. Misses for the same
//! prompt are coalesced: each key has an in-flight lock, so concurrent
//! callers wait for the first generation instead of issuing their own.
//! The lock and its table slot are released on drop, which keeps the state
//! consistent when a caller's future is cancelled mid-generation.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;

use super::prompt::PromptTruncator;
use super::RagError;
use crate::llm::CompletionModel;

pub struct GenerationCache {
    model: Arc<dyn CompletionModel>,
    truncator: Option<PromptTruncator>,
    max_output_tokens: usize,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

struct CacheState {
    entries: LruCache<String, String>,
    in_flight: HashMap<String, InFlight>,
}

/// Per-key generation lock and the number of callers holding or awaiting it.
/// `holders` only changes under the state mutex.
#[derive(Default)]
struct InFlight {
    lock: Arc<AsyncMutex<()>>,
    holders: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub in_flight: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Holds a key's in-flight slot; the last holder removes it from the table.
struct InFlightSlot<'a> {
    cache: &'a GenerationCache,
    key: &'a str,
    lock: Arc<AsyncMutex<()>>,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        let mut state = self.cache.state();
        let Some(entry) = state.in_flight.get_mut(self.key) else {
            return;
        };
        if !Arc::ptr_eq(&entry.lock, &self.lock) {
            return;
        }
        entry.holders -= 1;
        if entry.holders == 0 {
            state.in_flight.remove(self.key);
        }
    }
}

impl GenerationCache {
    pub fn new(model: Arc<dyn CompletionModel>, capacity: usize, max_output_tokens: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            model,
            truncator: None,
            max_output_tokens,
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                in_flight: HashMap::new(),
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Truncates prompts to the input budget before lookup and generation.
    pub fn with_truncator(mut self, truncator: PromptTruncator) -> Self {
        self.truncator = Some(truncator);
        self
    }

    pub fn model_id(&self) -> &str {
        self.model.model_id()
    }

    /// Cached completion for `prompt`, generating it on a miss.
    ///
    /// Failures are returned as `GenerationFailed` and never cached.
    pub async fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let prompt = self.fit_to_budget(prompt);

        if let Some(hit) = self.lookup(prompt) {
            return Ok(hit);
        }

        let slot = self.claim(prompt);
        let _turn = slot.lock.lock().await;

        // Filled by the holder we waited behind.
        if let Some(hit) = self.lookup(prompt) {
            return Ok(hit);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            prompt_chars = prompt.len(),
            model = self.model.model_id(),
            "Generation cache miss"
        );

        let completion = self
            .model
            .complete(prompt, self.max_output_tokens)
            .await
            .map_err(|e| {
                tracing::warn!("Generation failed: {}", e);
                RagError::GenerationFailed(e.to_string())
            })?;

        self.state()
            .entries
            .put(prompt.to_string(), completion.clone());
        Ok(completion)
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state();
        CacheStats {
            entries: state.entries.len(),
            capacity: state.entries.cap().get(),
            in_flight: state.in_flight.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    fn fit_to_budget<'a>(&self, prompt: &'a str) -> &'a str {
        let Some(truncator) = &self.truncator else {
            return prompt;
        };
        let fitted = truncator.truncate(prompt);
        if fitted.len() < prompt.len() {
            tracing::debug!(
                from_chars = prompt.len(),
                to_chars = fitted.len(),
                max_tokens = truncator.max_tokens(),
                "Truncated prompt to model input budget"
            );
        }
        fitted
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        // Never held across an await or a panic point that leaves it half-updated.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lookup that also refreshes the entry's recency.
    fn lookup(&self, prompt: &str) -> Option<String> {
        let hit = self.state().entries.get(prompt).cloned();
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Generation cache hit");
        }
        hit
    }

    fn claim<'a>(&'a self, prompt: &'a str) -> InFlightSlot<'a> {
        let lock = {
            let mut state = self.state();
            let entry = state.in_flight.entry(prompt.to_string()).or_default();
            entry.holders += 1;
            entry.lock.clone()
        };
        InFlightSlot {
            cache: self,
            key: prompt,
            lock,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::llm::LlmError;

    /// Echoes the prompt after `delay`, counting invocations.
    struct CountingModel {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl CountingModel {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionModel for CountingModel {
        fn model_id(&self) -> &str {
            "counting"
        }

        async fn complete(&self, prompt: &str, _max: usize) -> Result<String, LlmError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(LlmError::Request("model offline".into()));
            }
            Ok(format!("{} #{}", prompt, call))
        }
    }

    #[tokio::test]
    async fn repeated_calls_generate_once() {
        let model = CountingModel::new(Duration::ZERO);
        let cache = GenerationCache::new(model.clone(), 10, 100);

        let first = cache.generate("p").await.unwrap();
        for _ in 0..5 {
            assert_eq!(cache.generate("p").await.unwrap(), first);
        }

        assert_eq!(model.calls(), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (5, 1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_calls_for_one_prompt_generate_once() {
        let model = CountingModel::new(Duration::from_millis(50));
        let cache = Arc::new(GenerationCache::new(model.clone(), 10, 100));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.generate("same prompt").await })
            })
            .collect();

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap().unwrap());
        }

        assert_eq!(model.calls(), 1);
        assert!(results.iter().all(|r| r == "same prompt #1"));
        assert_eq!(cache.stats().in_flight, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_prompts_do_not_block_each_other() {
        let model = CountingModel::new(Duration::from_millis(50));
        let cache = Arc::new(GenerationCache::new(model.clone(), 10, 100));

        let started = tokio::time::Instant::now();
        let (a, b) = tokio::join!(cache.generate("a"), cache.generate("b"));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(model.calls(), 2);
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn least_recently_used_entry_is_evicted() {
        let model = CountingModel::new(Duration::ZERO);
        let cache = GenerationCache::new(model.clone(), 2, 100);

        cache.generate("a").await.unwrap();
        cache.generate("b").await.unwrap();
        cache.generate("a").await.unwrap(); // refresh "a"
        cache.generate("c").await.unwrap(); // evicts "b"
        assert_eq!(model.calls(), 3);
        assert_eq!(cache.stats().entries, 2);

        cache.generate("a").await.unwrap();
        cache.generate("c").await.unwrap();
        assert_eq!(model.calls(), 3);

        assert_eq!(cache.generate("b").await.unwrap(), "b #4");
        assert_eq!(model.calls(), 4);
    }

    #[tokio::test]
    async fn keys_are_exact_strings() {
        let model = CountingModel::new(Duration::ZERO);
        let cache = GenerationCache::new(model.clone(), 10, 100);

        cache.generate("Cats are great").await.unwrap();
        cache.generate("cats are great").await.unwrap();
        cache.generate("cats  are great").await.unwrap();
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let model = CountingModel::failing();
        let cache = GenerationCache::new(model.clone(), 10, 100);

        assert!(matches!(
            cache.generate("p").await,
            Err(RagError::GenerationFailed(msg)) if msg.contains("model offline")
        ));
        assert!(cache.generate("p").await.is_err());
        assert_eq!(model.calls(), 2);

        let stats = cache.stats();
        assert_eq!((stats.entries, stats.in_flight), (0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_generation_releases_the_key() {
        let model = CountingModel::new(Duration::from_secs(10));
        let cache = GenerationCache::new(model.clone(), 10, 100);

        let timed_out =
            tokio::time::timeout(Duration::from_secs(1), cache.generate("slow")).await;
        assert!(timed_out.is_err());
        assert_eq!(cache.stats().in_flight, 0);
        assert_eq!(cache.stats().entries, 0);

        assert_eq!(cache.generate("slow").await.unwrap(), "slow #2");
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_takes_over_after_holder_is_cancelled() {
        let model = CountingModel::new(Duration::from_secs(10));
        let cache = Arc::new(GenerationCache::new(model.clone(), 10, 100));

        let holder = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.generate("p").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let waiter = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.generate("p").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        holder.abort();
        assert!(holder.await.unwrap_err().is_cancelled());

        assert_eq!(waiter.await.unwrap().unwrap(), "p #2");
        assert_eq!(model.calls(), 2);
        assert_eq!(cache.stats().in_flight, 0);
    }

    #[tokio::test]
    async fn prompts_are_truncated_before_keying() {
        let model = CountingModel::new(Duration::ZERO);
        let cache = GenerationCache::new(model.clone(), 10, 100)
            .with_truncator(PromptTruncator::words(2));

        assert_eq!(cache.generate("one two three").await.unwrap(), "one two #1");
        assert_eq!(cache.generate("one two four").await.unwrap(), "one two #1");
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn in_flight_slot_is_removed_by_the_last_holder_only() {
        let cache = GenerationCache::new(CountingModel::new(Duration::ZERO), 10, 100);

        let first = cache.claim("k");
        let second = cache.claim("k");
        assert!(Arc::ptr_eq(&first.lock, &second.lock));
        assert_eq!(cache.stats().in_flight, 1);

        drop(first);
        assert_eq!(cache.stats().in_flight, 1);
        drop(second);
        assert_eq!(cache.stats().in_flight, 0);

        // A fresh claim after release starts a new slot.
        let third = cache.claim("k");
        assert_eq!(cache.state().in_flight["k"].holders, 1);
        drop(third);
        assert_eq!(cache.stats().in_flight, 0);
    }

    #[test]
    fn holders_released_together_from_many_threads_leave_no_slot() {
        let cache = GenerationCache::new(CountingModel::new(Duration::ZERO), 10, 100);
        let keys: Vec<String> = (0..200).map(|i| format!("key-{}", i)).collect();

        for _ in 0..20 {
            let barrier = std::sync::Barrier::new(4);
            std::thread::scope(|scope| {
                for _ in 0..4 {
                    scope.spawn(|| {
                        let slots: Vec<_> = keys.iter().map(|key| cache.claim(key)).collect();
                        barrier.wait();
                        drop(slots);
                    });
                }
            });
            assert_eq!(cache.stats().in_flight, 0);
        }
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let cache = GenerationCache::new(CountingModel::new(Duration::ZERO), 0, 100);
        assert_eq!(cache.stats().capacity, 1);
    }
}
