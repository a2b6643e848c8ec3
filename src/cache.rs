//! Memoizing wrappers for pure unary functions.
//!
//! A [`Memoized`] owns the wrapped function and a result store keyed by the
//! argument value. The first call with an argument runs the function and keeps
//! the result; later calls with an equal argument return the stored clone.
//!
//! # Failures
//! Fallible functions return `Result<R, E>`. An `Err` is handed back to the
//! caller unchanged and nothing is stored, so the next call with the same
//! argument runs the function again.
//!
//! # Storage
//! - [`CachePolicy::Unbounded`]: entries live as long as the cache.
//! - [`CachePolicy::Lru`]: at most `capacity` entries, least recently used
//!   evicted first.
//!
//! # Threads
//! [`Memoized`] needs `&mut self` and is meant for a single thread.
//! [`SharedMemoized`] guards its store with a mutex and takes a `Fn`. The lock
//! is released while the function runs, so recursive functions may call the
//! same cache; concurrent callers for one key wait on the first computation.

use crate::config::{CachePolicy, DEFAULT_CACHE_PREALLOC};
use log::debug;
use lru::LruCache;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::hash::Hash;
use std::marker::PhantomData;
use std::thread::{self, ThreadId};

/// Hit/miss counters for a cache instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Calls whose function invocation failed (never stored).
    pub failures: u64,
}

impl CacheStats {
    /// Fraction of lookups answered from the store, 0.0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

enum Store<A, R> {
    Unbounded(HashMap<A, R>),
    Lru(LruCache<A, R>),
}

impl<A: Eq + Hash, R: Clone> Store<A, R> {
    fn with_policy(policy: CachePolicy) -> Self {
        match policy {
            CachePolicy::Unbounded => {
                Store::Unbounded(HashMap::with_capacity(DEFAULT_CACHE_PREALLOC))
            }
            CachePolicy::Lru(capacity) => Store::Lru(LruCache::new(capacity)),
        }
    }

    fn lookup(&mut self, key: &A) -> Option<R> {
        match self {
            Store::Unbounded(map) => map.get(key).cloned(),
            Store::Lru(lru) => lru.get(key).cloned(),
        }
    }

    fn insert(&mut self, key: A, value: R) {
        match self {
            Store::Unbounded(map) => {
                map.insert(key, value);
            }
            Store::Lru(lru) => {
                // Keys are only inserted after a miss, so a returned pair is an eviction.
                if lru.push(key, value).is_some() {
                    debug!("LRU cache full, evicted least recently used entry");
                }
            }
        }
    }

    fn contains(&self, key: &A) -> bool {
        match self {
            Store::Unbounded(map) => map.contains_key(key),
            Store::Lru(lru) => lru.contains(key),
        }
    }

    fn len(&self) -> usize {
        match self {
            Store::Unbounded(map) => map.len(),
            Store::Lru(lru) => lru.len(),
        }
    }

    fn clear(&mut self) {
        match self {
            Store::Unbounded(map) => map.clear(),
            Store::Lru(lru) => lru.clear(),
        }
    }
}

/// A function wrapped with a result cache.
///
/// `A` is the argument type, `R` the cached result, `E` the error type of the
/// wrapped function (use [`memoize`] for functions that cannot fail).
pub struct Memoized<A, R, E, F> {
    func: F,
    store: Store<A, R>,
    stats: CacheStats,
    policy: CachePolicy,
    _error: PhantomData<fn() -> E>,
}

impl<A, R, E, F> Memoized<A, R, E, F>
where
    A: Eq + Hash + Clone,
    R: Clone,
    F: FnMut(&A) -> Result<R, E>,
{
    /// Wrap a fallible function with an unbounded cache.
    pub fn new(func: F) -> Self {
        Self::with_policy(func, CachePolicy::Unbounded)
    }

    pub fn with_policy(func: F, policy: CachePolicy) -> Self {
        Self {
            func,
            store: Store::with_policy(policy),
            stats: CacheStats::default(),
            policy,
            _error: PhantomData,
        }
    }

    /// Return the cached result for `arg`, running the function on a miss.
    ///
    /// An error from the function is returned as is and not stored.
    pub fn try_get(&mut self, arg: &A) -> Result<R, E> {
        if let Some(hit) = self.store.lookup(arg) {
            self.stats.hits += 1;
            return Ok(hit);
        }
        self.stats.misses += 1;
        match (self.func)(arg) {
            Ok(value) => {
                self.store.insert(arg.clone(), value.clone());
                Ok(value)
            }
            Err(err) => {
                self.stats.failures += 1;
                debug!("Memoized function failed, result not cached");
                Err(err)
            }
        }
    }

    pub fn contains(&self, arg: &A) -> bool {
        self.store.contains(arg)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.len() == 0
    }

    /// Drop every stored result. Counters are kept.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }
}

impl<A, R, F> Memoized<A, R, Infallible, F>
where
    A: Eq + Hash + Clone,
    R: Clone,
    F: FnMut(&A) -> Result<R, Infallible>,
{
    /// Return the cached result for `arg`, running the function on a miss.
    pub fn get(&mut self, arg: &A) -> R {
        match self.try_get(arg) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}

/// Wrap an infallible function with an unbounded cache.
pub fn memoize<A, R, G>(
    mut func: G,
) -> Memoized<A, R, Infallible, impl FnMut(&A) -> Result<R, Infallible>>
where
    A: Eq + Hash + Clone,
    R: Clone,
    G: FnMut(&A) -> R,
{
    Memoized::new(move |arg: &A| Ok(func(arg)))
}

/// Wrap an infallible function with a cache using `policy`.
pub fn memoize_with_policy<A, R, G>(
    mut func: G,
    policy: CachePolicy,
) -> Memoized<A, R, Infallible, impl FnMut(&A) -> Result<R, Infallible>>
where
    A: Eq + Hash + Clone,
    R: Clone,
    G: FnMut(&A) -> R,
{
    Memoized::with_policy(move |arg: &A| Ok(func(arg)), policy)
}

struct SharedState<A, R> {
    store: Store<A, R>,
    /// Keys being computed right now, with the thread computing each.
    in_flight: HashMap<A, ThreadId>,
    stats: CacheStats,
}

/// Releases an in-flight key and wakes waiters, also when the function panics.
struct Claim<'a, A: Eq + Hash, R> {
    state: &'a Mutex<SharedState<A, R>>,
    ready: &'a Condvar,
    key: &'a A,
}

impl<A: Eq + Hash, R> Drop for Claim<'_, A, R> {
    fn drop(&mut self) {
        self.state.lock().in_flight.remove(self.key);
        self.ready.notify_all();
    }
}

/// A memoized function callable through `&self` from many threads.
///
/// The function runs without the lock held, so it may call back into the same
/// cache (recursive definitions such as Fibonacci). A thread asking for a key
/// that another thread is computing waits for that result instead of
/// computing it again.
pub struct SharedMemoized<A, R, E, F> {
    func: F,
    state: Mutex<SharedState<A, R>>,
    ready: Condvar,
    policy: CachePolicy,
    _error: PhantomData<fn() -> E>,
}

impl<A, R, E, F> SharedMemoized<A, R, E, F>
where
    A: Eq + Hash + Clone,
    R: Clone,
    F: Fn(&A) -> Result<R, E>,
{
    pub fn new(func: F) -> Self {
        Self::with_policy(func, CachePolicy::Unbounded)
    }

    pub fn with_policy(func: F, policy: CachePolicy) -> Self {
        Self {
            func,
            state: Mutex::new(SharedState {
                store: Store::with_policy(policy),
                in_flight: HashMap::new(),
                stats: CacheStats::default(),
            }),
            ready: Condvar::new(),
            policy,
            _error: PhantomData,
        }
    }

    pub fn try_get(&self, arg: &A) -> Result<R, E> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            if let Some(hit) = state.store.lookup(arg) {
                state.stats.hits += 1;
                return Ok(hit);
            }
            match state.in_flight.get(arg).copied() {
                // The function asked for its own argument; waiting would never end.
                Some(owner) if owner == me => {
                    state.stats.misses += 1;
                    drop(state);
                    return (self.func)(arg);
                }
                Some(_) => self.ready.wait(&mut state),
                None => break,
            }
        }
        state.stats.misses += 1;
        state.in_flight.insert(arg.clone(), me);
        drop(state);

        let _claim = Claim {
            state: &self.state,
            ready: &self.ready,
            key: arg,
        };
        let result = (self.func)(arg);

        let mut state = self.state.lock();
        match &result {
            Ok(value) => state.store.insert(arg.clone(), value.clone()),
            Err(_) => {
                state.stats.failures += 1;
                debug!("Memoized function failed, result not cached");
            }
        }
        drop(state);
        result
    }

    pub fn contains(&self, arg: &A) -> bool {
        self.state.lock().store.contains(arg)
    }

    pub fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every stored result. Counters are kept.
    pub fn clear(&self) {
        self.state.lock().store.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }
}

impl<A, R, F> SharedMemoized<A, R, Infallible, F>
where
    A: Eq + Hash + Clone,
    R: Clone,
    F: Fn(&A) -> Result<R, Infallible>,
{
    pub fn get(&self, arg: &A) -> R {
        match self.try_get(arg) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}
