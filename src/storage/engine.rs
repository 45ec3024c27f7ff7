//! Concurrent Cache Store with Expiry Support
//!
//! This module implements the store behind every command: one map from key
//! to [`Entry`], guarded by a single reader/writer lock.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                StorageEngine                 │
//! │   RwLock<HashMap<Bytes, Entry>>              │
//! │                                              │
//! │   GET EXISTS TTL LRANGE      ──> read lock   │
//! │   SET DEL INCR LPUSH ... ──────> write lock  │
//! │   ExpirySweeper          ──────> write lock  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Every operation holds the lock for exactly its own in-memory work and
//! releases it before returning, so operations are atomic one at a time and
//! the lock is never held across an await point or I/O.
//!
//! ## Expiry
//!
//! An entry whose deadline has passed is invisible to every operation
//! (lazy expiry). Readers do not remove it, since they only hold the read
//! lock; mutators drop it before acting, and the background sweeper
//! reclaims whatever is left.

use crate::error::{CacheError, CacheResult};
use crate::storage::entry::{deadline, Entry, Value};
use crate::storage::expiry::{ExpiryConfig, ExpirySweeper};
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

type Map = HashMap<Bytes, Entry>;

/// Point-in-time statistics about the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Live (non-expired) keys
    pub keys: u64,
    /// Live keys carrying an expiry deadline
    pub expiring: u64,
    /// Expired entries physically removed since startup
    pub expired: u64,
}

/// The cache store.
///
/// Wrap it in an `Arc` and share it across connection tasks; all methods
/// take `&self`.
///
/// # Example
///
/// ```
/// use tinycache::storage::{StorageEngine, Value};
/// use bytes::Bytes;
///
/// let engine = StorageEngine::new();
///
/// engine.set(Bytes::from("visits"), Bytes::from("10"));
/// assert_eq!(engine.value(b"visits"), Some(Value::Integer(10)));
/// assert_eq!(engine.incr(&Bytes::from("visits")), Ok(11));
///
/// engine.rpush(Bytes::from("queue"), vec![Bytes::from("a"), Bytes::from("b")]).unwrap();
/// assert_eq!(engine.lrange(b"queue", 0, -1).unwrap().len(), 2);
/// ```
pub struct StorageEngine {
    data: RwLock<Map>,

    /// Statistics: expired entries removed (by the sweeper or by mutators)
    expired_count: AtomicU64,

    /// Background sweeper owned by this store, if one was started
    sweeper: Option<ExpirySweeper>,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("entries", &self.read().len())
            .field("expired_count", &self.expired_count.load(Ordering::Relaxed))
            .field("sweeper", &self.sweeper.is_some())
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an empty store with no background sweeper.
    ///
    /// Expired keys are still hidden from every read; call
    /// [`cleanup_expired`](Self::cleanup_expired) to reclaim them.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            expired_count: AtomicU64::new(0),
            sweeper: None,
        }
    }

    /// Creates a shared store that owns a running [`ExpirySweeper`].
    ///
    /// The sweeper stops when the last `Arc` to the store is dropped.
    /// Must be called from within a Tokio runtime.
    pub fn with_sweeper(config: ExpiryConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            data: RwLock::new(HashMap::new()),
            expired_count: AtomicU64::new(0),
            sweeper: Some(ExpirySweeper::start(weak.clone(), config)),
        })
    }

    /// The sweeper handle, if this store runs one.
    pub fn sweeper(&self) -> Option<&ExpirySweeper> {
        self.sweeper.as_ref()
    }

    // A panicking thread cannot leave a command half-applied (each one is a
    // single map operation), so a poisoned lock is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, Map> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Map> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drops `key` if it has expired, so the caller only sees live entries.
    fn purge_if_expired(&self, data: &mut Map, key: &[u8]) {
        if data.get(key).is_some_and(Entry::is_expired) {
            data.remove(key);
            self.expired_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Looks up a live entry under a read guard.
    fn live<'a>(data: &'a Map, key: &[u8]) -> Option<&'a Entry> {
        data.get(key).filter(|entry| !entry.is_expired())
    }

    // ========================================================================
    // KEY / STRING OPERATIONS
    // ========================================================================

    /// Stores `value` under `key`, replacing any previous entry and clearing
    /// its expiry. Text that parses as an integer is stored as `Integer`.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.write().insert(key, Entry::new(Value::from_input(value)));
    }

    /// Like [`set`](Self::set), but the new entry expires after `ttl`.
    pub fn set_with_ttl(&self, key: Bytes, value: Bytes, ttl: Duration) {
        self.write()
            .insert(key, Entry::with_ttl(Value::from_input(value), ttl));
    }

    /// Returns the value of `key` as a bulk string payload.
    ///
    /// Integers are rendered as decimal text. Lists are a `TypeError`.
    pub fn get(&self, key: &[u8]) -> CacheResult<Bytes> {
        let data = self.read();
        let entry = Self::live(&data, key).ok_or(CacheError::KeyNotFound)?;
        entry.value.to_bytes().ok_or_else(CacheError::wrong_type)
    }

    /// Returns a copy of the live value stored under `key`.
    pub fn value(&self, key: &[u8]) -> Option<Value> {
        Self::live(&self.read(), key).map(|entry| entry.value.clone())
    }

    /// Checks if a key exists (and is not expired).
    pub fn exists(&self, key: &[u8]) -> bool {
        Self::live(&self.read(), key).is_some()
    }

    /// Removes `key`, returning how many live keys were removed (0 or 1).
    pub fn delete(&self, key: &[u8]) -> u64 {
        match self.write().remove(key) {
            Some(entry) if !entry.is_expired() => 1,
            Some(_) => {
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                0
            }
            None => 0,
        }
    }

    /// Increments an integer value by 1.
    ///
    /// A missing key starts from 0. Text and list values are a `TypeError`.
    pub fn incr(&self, key: &Bytes) -> CacheResult<i64> {
        self.incr_by(key, 1)
    }

    /// Decrements an integer value by 1.
    pub fn decr(&self, key: &Bytes) -> CacheResult<i64> {
        self.incr_by(key, -1)
    }

    /// Adds `delta` to an integer value, keeping any expiry it had.
    pub fn incr_by(&self, key: &Bytes, delta: i64) -> CacheResult<i64> {
        let mut data = self.write();
        self.purge_if_expired(&mut data, key);

        let Some(entry) = data.get_mut(&key[..]) else {
            data.insert(key.clone(), Entry::new(Value::Integer(delta)));
            return Ok(delta);
        };

        match &mut entry.value {
            Value::Integer(n) => {
                *n = n.checked_add(delta).ok_or_else(|| {
                    CacheError::TypeError("increment or decrement would overflow".to_string())
                })?;
                Ok(*n)
            }
            Value::Text(_) => Err(CacheError::not_an_integer()),
            Value::List(_) => Err(CacheError::wrong_type()),
        }
    }

    // ========================================================================
    // EXPIRY OPERATIONS
    // ========================================================================

    /// Sets an expiry on an existing key.
    ///
    /// Returns `false` (and creates nothing) if the key doesn't exist.
    pub fn expire(&self, key: &[u8], ttl: Duration) -> bool {
        let mut data = self.write();
        self.purge_if_expired(&mut data, key);

        match data.get_mut(key) {
            Some(entry) => {
                entry.expires_at = Some(deadline(ttl));
                true
            }
            None => false,
        }
    }

    /// Removes the expiry from a key.
    ///
    /// - `Some(true)` if an expiry was removed
    /// - `Some(false)` if the key has no expiry
    /// - `None` if the key doesn't exist
    pub fn persist(&self, key: &[u8]) -> Option<bool> {
        let mut data = self.write();
        self.purge_if_expired(&mut data, key);

        data.get_mut(key)
            .map(|entry| entry.expires_at.take().is_some())
    }

    /// Gets the remaining TTL for a key in seconds, rounded up so a live key
    /// never reports 0.
    ///
    /// - `Some(seconds)` if the key exists and has an expiry
    /// - `Some(-1)` if the key exists but has no expiry
    /// - `None` if the key doesn't exist
    pub fn ttl(&self, key: &[u8]) -> Option<i64> {
        let data = self.read();
        let entry = Self::live(&data, key)?;
        Some(
            entry
                .remaining()
                .map(|left| {
                    i64::try_from(left.as_millis().div_ceil(1000)).unwrap_or(i64::MAX)
                })
                .unwrap_or(-1),
        )
    }

    // ========================================================================
    // LIST OPERATIONS
    // ========================================================================

    /// Returns the list under `key`, creating an empty one if the key is
    /// absent.
    fn list_for_push(data: &mut Map, key: Bytes) -> CacheResult<&mut VecDeque<Bytes>> {
        let entry = data
            .entry(key)
            .or_insert_with(|| Entry::new(Value::List(VecDeque::new())));

        match &mut entry.value {
            Value::List(list) => Ok(list),
            _ => Err(CacheError::wrong_type()),
        }
    }

    /// Pushes values to the head of a list, one at a time in argument order,
    /// so `LPUSH k a b c` leaves `c` at the head.
    ///
    /// # Returns
    /// The length of the list after the push operation.
    pub fn lpush(&self, key: Bytes, values: Vec<Bytes>) -> CacheResult<usize> {
        let mut data = self.write();
        self.purge_if_expired(&mut data, &key);

        let list = Self::list_for_push(&mut data, key)?;
        for value in values {
            list.push_front(value);
        }
        Ok(list.len())
    }

    /// Appends values to the tail of a list in argument order.
    ///
    /// # Returns
    /// The length of the list after the push operation.
    pub fn rpush(&self, key: Bytes, values: Vec<Bytes>) -> CacheResult<usize> {
        let mut data = self.write();
        self.purge_if_expired(&mut data, &key);

        let list = Self::list_for_push(&mut data, key)?;
        list.extend(values);
        Ok(list.len())
    }

    /// Removes and returns the head of a list.
    ///
    /// Returns `Ok(None)` for an existing but empty list; the key stays
    /// present.
    pub fn lpop(&self, key: &[u8]) -> CacheResult<Option<Bytes>> {
        self.pop(key, VecDeque::pop_front)
    }

    /// Removes and returns the tail of a list.
    pub fn rpop(&self, key: &[u8]) -> CacheResult<Option<Bytes>> {
        self.pop(key, VecDeque::pop_back)
    }

    fn pop(
        &self,
        key: &[u8],
        take: fn(&mut VecDeque<Bytes>) -> Option<Bytes>,
    ) -> CacheResult<Option<Bytes>> {
        let mut data = self.write();
        self.purge_if_expired(&mut data, key);

        let entry = data.get_mut(key).ok_or(CacheError::KeyNotFound)?;
        match &mut entry.value {
            Value::List(list) => Ok(take(list)),
            _ => Err(CacheError::wrong_type()),
        }
    }

    /// Returns the inclusive range `start..=end` of a list.
    ///
    /// Negative indices count from the end. An index at or past the end
    /// clamps to the last element and one before the start clamps to the
    /// first, so a `start` beyond the list still yields the last element.
    /// An empty list, or `start > end` after clamping, yields nothing.
    pub fn lrange(&self, key: &[u8], start: i64, end: i64) -> CacheResult<Vec<Bytes>> {
        let data = self.read();
        let entry = Self::live(&data, key).ok_or(CacheError::KeyNotFound)?;
        let Value::List(list) = &entry.value else {
            return Err(CacheError::wrong_type());
        };

        if list.is_empty() {
            return Ok(Vec::new());
        }

        let start = normalize_index(list.len(), start);
        let end = normalize_index(list.len(), end);
        if start > end {
            return Ok(Vec::new());
        }

        Ok(list.range(start..=end).cloned().collect())
    }

    // ========================================================================
    // WHOLE-STORE OPERATIONS
    // ========================================================================

    /// Removes every entry in one step.
    pub fn flush(&self) {
        self.write().clear();
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.read()
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StorageStats {
        let now = Instant::now();
        let data = self.read();
        let live = data.values().filter(|entry| !entry.is_expired_at(now));

        let (mut keys, mut expiring) = (0, 0);
        for entry in live {
            keys += 1;
            if entry.expires_at.is_some() {
                expiring += 1;
            }
        }

        StorageStats {
            keys,
            expiring,
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }

    /// Physically removes every expired entry.
    ///
    /// This is the sweeper's pass; it can also be called directly.
    ///
    /// # Returns
    /// The number of entries removed.
    pub fn cleanup_expired(&self) -> u64 {
        let now = Instant::now();
        let mut data = self.write();

        let before = data.len();
        data.retain(|_, entry| !entry.is_expired_at(now));
        let removed = (before - data.len()) as u64;

        self.expired_count.fetch_add(removed, Ordering::Relaxed);
        removed
    }
}

/// Maps a possibly negative index onto `0..len` (`len` must be non-zero).
fn normalize_index(len: usize, index: i64) -> usize {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let index = if index >= len {
        len - 1
    } else if index < 0 {
        (len + index).max(0)
    } else {
        index
    };
    index as usize
}
