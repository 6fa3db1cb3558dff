//! Keyed async query cache with stale-while-revalidate semantics.
//!
//! Inspired by TanStack Query, `QueryClient<K, E>` owns one entry per query
//! key. Views subscribe to a key with a fetcher; the client returns whatever
//! is cached right away and spawns the fetcher when data is missing or stale.
//! Completed fetches travel back over a channel and are applied by the event
//! loop, so the store itself is only ever mutated from one task.
//!
//! # Example
//!
//! ```ignore
//! let mut queries: QueryClient<MyKey, ApiError> = QueryClient::new(QueryConfig::default());
//!
//! let api = api_client.clone();
//! let result = queries.subscribe(
//!     MyKey::Posts,
//!     move || {
//!         let api = api.clone();
//!         async move { api.fetch_post_list().await }
//!     },
//!     QueryOptions::default(),
//! );
//!
//! // In the event loop
//! let key = queries.next_update().await;
//!
//! // In render
//! match queries.observe::<Vec<Post>>(&MyKey::Posts).status {
//!     QueryStatus::Loading => render_spinner(),
//!     ...
//! }
//! ```

use chrono::{DateTime, Local};
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Identifies a cached query.
pub trait QueryKey: Clone + Eq + Hash + fmt::Debug + Send + 'static {
  /// Human-readable form, used in logs and the devtools panel
  fn description(&self) -> String;
}

/// Lifecycle status of a query entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// No entry, or the query is disabled
  Idle,
  /// First fetch in progress, no data yet
  Loading,
  /// Last fetch failed
  Error,
  /// Data is available
  Success,
}

impl QueryStatus {
  pub fn label(&self) -> &'static str {
    match self {
      QueryStatus::Idle => "idle",
      QueryStatus::Loading => "loading",
      QueryStatus::Error => "error",
      QueryStatus::Success => "success",
    }
  }
}

/// Client-wide defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryConfig {
  /// Age after which cached data is refetched on the next subscription
  pub stale_time: Duration,
  /// How long an entry without observers is kept before collection
  pub gc_time: Duration,
}

impl Default for QueryConfig {
  fn default() -> Self {
    Self {
      stale_time: Duration::ZERO,
      gc_time: Duration::from_secs(5 * 60),
    }
  }
}

/// Per-subscription options
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
  pub enabled: bool,
  /// Overrides `QueryConfig::stale_time` for this key
  pub stale_time: Option<Duration>,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      enabled: true,
      stale_time: None,
    }
  }
}

impl QueryOptions {
  #[allow(dead_code)]
  pub fn enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }

  #[allow(dead_code)]
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = Some(stale_time);
    self
  }
}

/// Snapshot of a query entry as seen by a view
#[derive(Debug, Clone)]
pub struct QueryResult<T, E> {
  pub status: QueryStatus,
  pub data: Option<Arc<T>>,
  pub error: Option<E>,
  pub is_fetching: bool,
}

impl<T, E> QueryResult<T, E> {
  pub fn idle() -> Self {
    Self {
      status: QueryStatus::Idle,
      data: None,
      error: None,
      is_fetching: false,
    }
  }

  #[allow(dead_code)]
  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Loading
  }

  pub fn is_success(&self) -> bool {
    self.status == QueryStatus::Success
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Error
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_deref()
  }

  pub fn error(&self) -> Option<&E> {
    self.error.as_ref()
  }

  /// Cached data is on screen while a newer copy is being fetched
  pub fn is_background_updating(&self) -> bool {
    self.is_fetching && self.is_success()
  }
}

/// Devtools view of a single entry
#[derive(Debug, Clone)]
pub struct QueryEntryInfo<K> {
  pub key: K,
  pub status: QueryStatus,
  pub is_fetching: bool,
  pub is_stale: bool,
  pub observers: usize,
  pub updated_at: Option<DateTime<Local>>,
}

type AnyData = Arc<dyn Any + Send + Sync>;

type Fetcher<E> = Arc<dyn Fn() -> BoxFuture<'static, Result<AnyData, E>> + Send + Sync>;

struct Completion<K, E> {
  key: K,
  result: Result<AnyData, E>,
}

struct QueryEntry<E> {
  status: QueryStatus,
  data: Option<AnyData>,
  error: Option<E>,
  is_fetching: bool,
  invalidated: bool,
  updated_at: Option<Instant>,
  updated_at_wall: Option<DateTime<Local>>,
  stale_time: Duration,
  observers: usize,
  inactive_since: Option<Instant>,
  fetcher: Option<Fetcher<E>>,
}

impl<E> QueryEntry<E> {
  fn new(stale_time: Duration) -> Self {
    Self {
      status: QueryStatus::Idle,
      data: None,
      error: None,
      is_fetching: false,
      invalidated: false,
      updated_at: None,
      updated_at_wall: None,
      stale_time,
      observers: 0,
      inactive_since: None,
      fetcher: None,
    }
  }

  fn is_stale(&self) -> bool {
    self.invalidated
      || self
        .updated_at
        .map(|t| t.elapsed() >= self.stale_time)
        .unwrap_or(true)
  }
}

/// Process-wide query store.
///
/// Fetches run on spawned tokio tasks; their results are only applied in
/// `poll()` / `next_update()`, which makes the caller's task the single
/// writer for every key.
pub struct QueryClient<K: QueryKey, E> {
  entries: HashMap<K, QueryEntry<E>>,
  config: QueryConfig,
  tx: mpsc::UnboundedSender<Completion<K, E>>,
  rx: mpsc::UnboundedReceiver<Completion<K, E>>,
}

impl<K, E> QueryClient<K, E>
where
  K: QueryKey,
  E: Clone + fmt::Display + Send + 'static,
{
  pub fn new(config: QueryConfig) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      entries: HashMap::new(),
      config,
      tx,
      rx,
    }
  }

  pub fn config(&self) -> &QueryConfig {
    &self.config
  }

  /// Register interest in `key`.
  ///
  /// Returns the cached state immediately. A fetch is spawned when the key
  /// has no data yet or its data is stale, unless one is already in flight.
  /// With `enabled: false` nothing is fetched and a missing entry stays
  /// missing.
  pub fn subscribe<T, F, Fut>(&mut self, key: K, fetcher: F, options: QueryOptions) -> QueryResult<T, E>
  where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
  {
    let stale_time = options.stale_time.unwrap_or(self.config.stale_time);

    if !options.enabled {
      if let Some(entry) = self.entries.get_mut(&key) {
        entry.observers += 1;
        entry.inactive_since = None;
      }
      return self.observe(&key);
    }

    let entry = self
      .entries
      .entry(key.clone())
      .or_insert_with(|| QueryEntry::new(stale_time));

    entry.stale_time = stale_time;
    entry.observers += 1;
    entry.inactive_since = None;
    entry.fetcher = Some(Arc::new(move || {
      let fut = fetcher();
      async move { fut.await.map(|data| Arc::new(data) as AnyData) }.boxed()
    }));

    if !entry.is_fetching && (entry.data.is_none() || entry.is_stale()) {
      Self::start_fetch(&self.tx, &key, entry);
    }

    self.observe(&key)
  }

  /// Drop one observer from `key`. Any in-flight fetch keeps running.
  pub fn unsubscribe(&mut self, key: &K) {
    if let Some(entry) = self.entries.get_mut(key) {
      entry.observers = entry.observers.saturating_sub(1);
      if entry.observers == 0 {
        entry.inactive_since = Some(Instant::now());
      }
    }
  }

  /// Current state of `key` without side effects.
  pub fn observe<T: Send + Sync + 'static>(&self, key: &K) -> QueryResult<T, E> {
    match self.entries.get(key) {
      Some(entry) => QueryResult {
        status: entry.status,
        data: entry.data.clone().and_then(|d| d.downcast::<T>().ok()),
        error: entry.error.clone(),
        is_fetching: entry.is_fetching,
      },
      None => QueryResult::idle(),
    }
  }

  /// Cached data for `key`, if any. Never fetches.
  pub fn get_query_data<T: Send + Sync + 'static>(&self, key: &K) -> Option<Arc<T>> {
    self
      .entries
      .get(key)
      .and_then(|entry| entry.data.clone())
      .and_then(|data| data.downcast::<T>().ok())
  }

  /// Mark `key` stale and fetch it again unless a fetch is already running.
  ///
  /// Returns `false` when the key has never been subscribed.
  pub fn refetch(&mut self, key: &K) -> bool {
    let Some(entry) = self.entries.get_mut(key) else {
      return false;
    };
    entry.invalidated = true;
    if !entry.is_fetching {
      Self::start_fetch(&self.tx, key, entry);
    }
    true
  }

  /// Apply every completed fetch without waiting.
  ///
  /// Returns `true` if any entry changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(completion) = self.rx.try_recv() {
      self.apply(completion);
      changed = true;
    }
    changed
  }

  /// Wait for the next fetch to complete, apply it and return its key.
  pub async fn next_update(&mut self) -> K {
    loop {
      // The client owns a sender, so the channel never closes.
      if let Some(completion) = self.rx.recv().await {
        let key = completion.key.clone();
        self.apply(completion);
        return key;
      }
    }
  }

  /// Number of fetches currently in flight.
  pub fn fetching_count(&self) -> usize {
    self.entries.values().filter(|e| e.is_fetching).count()
  }

  /// Remove entries that have had no observers for at least `gc_time`.
  pub fn collect_garbage(&mut self) -> usize {
    let gc_time = self.config.gc_time;
    let before = self.entries.len();
    self.entries.retain(|key, entry| {
      let expired = !entry.is_fetching
        && entry.observers == 0
        && entry
          .inactive_since
          .map(|t| t.elapsed() >= gc_time)
          .unwrap_or(false);
      if expired {
        debug!(query = %key.description(), "collecting inactive query");
      }
      !expired
    });
    before - self.entries.len()
  }

  /// Snapshot of all entries, ordered by key description.
  pub fn entries(&self) -> Vec<QueryEntryInfo<K>> {
    let mut infos: Vec<QueryEntryInfo<K>> = self
      .entries
      .iter()
      .map(|(key, entry)| QueryEntryInfo {
        key: key.clone(),
        status: entry.status,
        is_fetching: entry.is_fetching,
        is_stale: entry.is_stale(),
        observers: entry.observers,
        updated_at: entry.updated_at_wall,
      })
      .collect();
    infos.sort_by_key(|info| info.key.description());
    infos
  }

  fn start_fetch(tx: &mpsc::UnboundedSender<Completion<K, E>>, key: &K, entry: &mut QueryEntry<E>) {
    let Some(fetcher) = entry.fetcher.clone() else {
      return;
    };

    entry.is_fetching = true;
    if entry.data.is_none() {
      entry.status = QueryStatus::Loading;
    }
    debug!(query = %key.description(), background = entry.data.is_some(), "fetch started");

    let future = fetcher();
    let tx = tx.clone();
    let key = key.clone();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - the client may have been dropped
      let _ = tx.send(Completion { key, result });
    });
  }

  fn apply(&mut self, completion: Completion<K, E>) {
    let Completion { key, result } = completion;
    let Some(entry) = self.entries.get_mut(&key) else {
      debug!(query = %key.description(), "dropping result for collected query");
      return;
    };

    entry.is_fetching = false;
    match result {
      Ok(data) => {
        entry.data = Some(data);
        entry.error = None;
        entry.status = QueryStatus::Success;
        entry.invalidated = false;
        entry.updated_at = Some(Instant::now());
        entry.updated_at_wall = Some(Local::now());
        debug!(query = %key.description(), "fetch succeeded");
      }
      Err(error) => {
        warn!(query = %key.description(), %error, "fetch failed");
        entry.error = Some(error);
        entry.status = QueryStatus::Error;
      }
    }
  }
}

impl<K: QueryKey, E> fmt::Debug for QueryClient<K, E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("QueryClient")
      .field("keys", &self.entries.keys().collect::<Vec<_>>())
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  #[derive(Debug, Clone, PartialEq, Eq, Hash)]
  enum TestKey {
    Items,
    Item(u32),
  }

  impl QueryKey for TestKey {
    fn description(&self) -> String {
      match self {
        TestKey::Items => "items".to_string(),
        TestKey::Item(id) => format!("item {}", id),
      }
    }
  }

  type Client = QueryClient<TestKey, String>;

  /// Fetcher that returns how many times it has been called
  fn counting_fetcher(
    counter: Arc<AtomicU32>,
  ) -> impl Fn() -> BoxFuture<'static, Result<u32, String>> + Send + Sync + 'static {
    move || {
      let counter = counter.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
      }
      .boxed()
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_first_subscribe_loads_then_succeeds() {
    let mut client = Client::new(QueryConfig::default());
    let counter = Arc::new(AtomicU32::new(0));

    let result = client.subscribe(TestKey::Items, counting_fetcher(counter.clone()), QueryOptions::default());
    assert!(result.is_loading());
    assert!(result.is_fetching);
    assert!(result.data().is_none());

    assert_eq!(client.next_update().await, TestKey::Items);

    let result = client.observe::<u32>(&TestKey::Items);
    assert!(result.is_success());
    assert_eq!(result.data(), Some(&1));
    assert!(!result.is_fetching);
  }

  #[tokio::test(start_paused = true)]
  async fn test_concurrent_subscribers_share_one_fetch() {
    let mut client = Client::new(QueryConfig::default());
    let counter = Arc::new(AtomicU32::new(0));

    client.subscribe(TestKey::Items, counting_fetcher(counter.clone()), QueryOptions::default());
    client.subscribe(TestKey::Items, counting_fetcher(counter.clone()), QueryOptions::default());
    client.subscribe(TestKey::Items, counting_fetcher(counter.clone()), QueryOptions::default());
    assert_eq!(client.fetching_count(), 1);

    client.next_update().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!client.poll());

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(client.entries()[0].observers, 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stale_entry_is_served_while_revalidating() {
    let mut client = Client::new(QueryConfig::default());
    let counter = Arc::new(AtomicU32::new(0));

    client.subscribe(TestKey::Items, counting_fetcher(counter.clone()), QueryOptions::default());
    client.next_update().await;
    client.unsubscribe(&TestKey::Items);

    let result = client.subscribe(TestKey::Items, counting_fetcher(counter.clone()), QueryOptions::default());
    assert!(result.is_success());
    assert_eq!(result.data(), Some(&1));
    assert!(result.is_background_updating());

    client.next_update().await;
    let result = client.observe::<u32>(&TestKey::Items);
    assert_eq!(result.data(), Some(&2));
    assert!(!result.is_background_updating());
  }

  #[tokio::test(start_paused = true)]
  async fn test_fresh_entry_is_not_refetched() {
    let config = QueryConfig {
      stale_time: Duration::from_secs(60),
      ..QueryConfig::default()
    };
    let mut client = Client::new(config);
    let counter = Arc::new(AtomicU32::new(0));

    client.subscribe(TestKey::Items, counting_fetcher(counter.clone()), QueryOptions::default());
    client.next_update().await;
    client.unsubscribe(&TestKey::Items);

    let result = client.subscribe(TestKey::Items, counting_fetcher(counter.clone()), QueryOptions::default());
    assert!(result.is_success());
    assert!(!result.is_fetching);
    client.unsubscribe(&TestKey::Items);

    tokio::time::advance(Duration::from_secs(61)).await;

    let result = client.subscribe(TestKey::Items, counting_fetcher(counter.clone()), QueryOptions::default());
    assert!(result.is_background_updating());
    client.next_update().await;
    assert_eq!(counter.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_per_query_stale_time_overrides_default() {
    let mut client = Client::new(QueryConfig::default());
    let counter = Arc::new(AtomicU32::new(0));
    let options = QueryOptions::default().with_stale_time(Duration::from_secs(30));

    client.subscribe(TestKey::Items, counting_fetcher(counter.clone()), options);
    client.next_update().await;

    let result = client.subscribe(TestKey::Items, counting_fetcher(counter.clone()), options);
    assert!(!result.is_fetching);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_error_is_stored_and_resubscribe_retries() {
    let mut client = Client::new(QueryConfig::default());
    let attempts = Arc::new(AtomicU32::new(0));
    let fetcher = {
      let attempts = attempts.clone();
      move || {
        let attempts = attempts.clone();
        async move {
          if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            Err("Request failed with status code 500".to_string())
          } else {
            Ok(7u32)
          }
        }
      }
    };

    client.subscribe(TestKey::Item(1), fetcher.clone(), QueryOptions::default());
    client.next_update().await;

    let result = client.observe::<u32>(&TestKey::Item(1));
    assert!(result.is_error());
    assert_eq!(result.error().map(String::as_str), Some("Request failed with status code 500"));
    assert!(client.get_query_data::<u32>(&TestKey::Item(1)).is_none());

    client.unsubscribe(&TestKey::Item(1));
    let result = client.subscribe(TestKey::Item(1), fetcher, QueryOptions::default());
    assert!(result.is_loading());

    client.next_update().await;
    let result = client.observe::<u32>(&TestKey::Item(1));
    assert!(result.is_success());
    assert!(result.error().is_none());
    assert_eq!(result.data(), Some(&7));
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_revalidation_keeps_previous_data() {
    let mut client = Client::new(QueryConfig::default());
    let attempts = Arc::new(AtomicU32::new(0));
    let fetcher = {
      let attempts = attempts.clone();
      move || {
        let attempts = attempts.clone();
        async move {
          if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(1u32)
          } else {
            Err("Network Error".to_string())
          }
        }
      }
    };

    client.subscribe(TestKey::Items, fetcher, QueryOptions::default());
    client.next_update().await;
    assert!(client.refetch(&TestKey::Items));
    client.next_update().await;

    let result = client.observe::<u32>(&TestKey::Items);
    assert!(result.is_error());
    assert_eq!(result.data(), Some(&1));
  }

  #[tokio::test(start_paused = true)]
  async fn test_disabled_query_never_fetches() {
    let mut client = Client::new(QueryConfig::default());
    let counter = Arc::new(AtomicU32::new(0));

    let result = client.subscribe(
      TestKey::Item(3),
      counting_fetcher(counter.clone()),
      QueryOptions::default().enabled(false),
    );
    assert_eq!(result.status, QueryStatus::Idle);
    assert!(!result.is_fetching);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!client.poll());
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert!(client.entries().is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_get_query_data_does_not_fetch() {
    let mut client = Client::new(QueryConfig::default());
    let counter = Arc::new(AtomicU32::new(0));

    assert!(client.get_query_data::<u32>(&TestKey::Item(1)).is_none());

    client.subscribe(TestKey::Item(1), counting_fetcher(counter.clone()), QueryOptions::default());
    client.next_update().await;

    assert_eq!(client.get_query_data::<u32>(&TestKey::Item(1)).as_deref(), Some(&1));
    assert!(client.get_query_data::<u32>(&TestKey::Item(2)).is_none());
    // Wrong type behaves like a miss
    assert!(client.get_query_data::<String>(&TestKey::Item(1)).is_none());
    assert_eq!(client.fetching_count(), 0);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_result_lands_after_unsubscribe() {
    let mut client = Client::new(QueryConfig::default());
    let counter = Arc::new(AtomicU32::new(0));

    client.subscribe(TestKey::Item(1), counting_fetcher(counter.clone()), QueryOptions::default());
    client.unsubscribe(&TestKey::Item(1));

    client.next_update().await;
    assert_eq!(client.get_query_data::<u32>(&TestKey::Item(1)).as_deref(), Some(&1));
  }

  #[tokio::test(start_paused = true)]
  async fn test_refetch_while_fetching_is_deduplicated() {
    let mut client = Client::new(QueryConfig::default());
    let counter = Arc::new(AtomicU32::new(0));

    assert!(!client.refetch(&TestKey::Items));

    client.subscribe(TestKey::Items, counting_fetcher(counter.clone()), QueryOptions::default());
    assert!(client.refetch(&TestKey::Items));
    client.next_update().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.poll();

    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_inactive_entries_are_collected_after_gc_time() {
    let mut client = Client::new(QueryConfig::default());
    let counter = Arc::new(AtomicU32::new(0));

    client.subscribe(TestKey::Items, counting_fetcher(counter.clone()), QueryOptions::default());
    client.subscribe(TestKey::Item(1), counting_fetcher(counter.clone()), QueryOptions::default());
    client.next_update().await;
    client.next_update().await;

    client.unsubscribe(&TestKey::Item(1));
    assert_eq!(client.collect_garbage(), 0);

    tokio::time::advance(Duration::from_secs(5 * 60)).await;
    assert_eq!(client.collect_garbage(), 1);
    assert!(client.get_query_data::<u32>(&TestKey::Item(1)).is_none());
    assert!(client.get_query_data::<u32>(&TestKey::Items).is_some());
  }

  #[tokio::test(start_paused = true)]
  async fn test_entries_snapshot() {
    let mut client = Client::new(QueryConfig::default());
    let counter = Arc::new(AtomicU32::new(0));

    client.subscribe(TestKey::Items, counting_fetcher(counter.clone()), QueryOptions::default());
    client.subscribe(TestKey::Item(2), counting_fetcher(counter.clone()), QueryOptions::default());
    client.next_update().await;
    client.next_update().await;
    client.unsubscribe(&TestKey::Item(2));

    let entries = client.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].key, TestKey::Item(2));
    assert_eq!(entries[0].observers, 0);
    assert_eq!(entries[1].key, TestKey::Items);
    assert_eq!(entries[1].status, QueryStatus::Success);
    assert!(entries[1].updated_at.is_some());
    // Zero stale time: stale as soon as it lands
    assert!(entries[1].is_stale);
  }
}
