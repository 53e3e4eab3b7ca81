//! The singleton cache.

use crate::error::{Error, Result};
use crate::value::Instance;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::hash::Hash;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Instances built under the singleton policy, keyed by canonical class.
///
/// Each class owns a `OnceCell`, so concurrent first callers block on the
/// same cell and share one construction, while classes never block each
/// other. Entries live until removed or the cache is dropped.
///
/// The cache also tracks which thread is building each class and which
/// class each thread is blocked on. A thread about to block on a cell whose
/// builder is, transitively, waiting on that thread fails with
/// [`Error::CircularDependency`] instead of deadlocking.
#[derive(Default)]
pub struct SingletonCache {
  cells: DashMap<String, Arc<OnceCell<Instance>>>,
  builders: DashMap<String, ThreadId>,
  waiting: DashMap<ThreadId, String>,
}

impl SingletonCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, class: &str) -> Option<Instance> {
    self
      .cells
      .get(class)
      .and_then(|cell| cell.value().get().cloned())
  }

  /// Stores `instance` for `class` unless one is already cached. Returns
  /// whether the write happened.
  pub fn put(&self, class: &str, instance: Instance) -> bool {
    self.cell(class).set(instance).is_ok()
  }

  /// Returns the cached instance, building it with `init` if absent. `init`
  /// runs at most once per class at a time; if it fails the cell stays
  /// empty and a later call may retry.
  pub fn get_or_try_init<F>(&self, class: &str, init: F) -> Result<Instance>
  where
    F: FnOnce() -> Result<Instance>,
  {
    // Clone the cell out so no map lock is held while `init` runs; `init`
    // may resolve other singletons.
    let cell = self.cell(class);
    if let Some(instance) = cell.get() {
      return Ok(instance.clone());
    }

    // Publish the wait before inspecting the graph: of two threads closing
    // a cycle at the same time, at least one sees the other's entry.
    let me = thread::current().id();
    self.waiting.insert(me, class.to_owned());
    let _waiting = Claim::new(&self.waiting, me, class.to_owned());
    if let Some(chain) = self.wait_cycle(class, me) {
      return Err(Error::CircularDependency {
        class: class.to_owned(),
        chain,
      });
    }

    cell
      .get_or_try_init(|| {
        self.waiting.remove_if(&me, |_, waited| waited == class);
        self.builders.insert(class.to_owned(), me);
        let _building = Claim::new(&self.builders, class.to_owned(), me);
        init()
      })
      .cloned()
  }

  pub fn contains(&self, class: &str) -> bool {
    self.get(class).is_some()
  }

  pub fn remove(&self, class: &str) -> Option<Instance> {
    self
      .cells
      .remove(class)
      .and_then(|(_, cell)| cell.get().cloned())
  }

  /// The number of built singletons.
  pub fn len(&self) -> usize {
    self
      .cells
      .iter()
      .filter(|entry| entry.value().get().is_some())
      .count()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn clear(&self) {
    self.cells.clear();
  }

  fn cell(&self, class: &str) -> Arc<OnceCell<Instance>> {
    if let Some(cell) = self.cells.get(class) {
      return Arc::clone(cell.value());
    }
    Arc::clone(self.cells.entry(class.to_owned()).or_default().value())
  }

  /// Follows builder -> waited-on class edges starting at `class`. Returns
  /// the cycle, starting and ending with a class `me` is building, if the
  /// walk comes back to `me`.
  fn wait_cycle(&self, class: &str, me: ThreadId) -> Option<Vec<String>> {
    let mut chain = vec![class.to_owned()];
    let mut current = class.to_owned();
    for _ in 0..=self.builders.len() {
      let builder = *self.builders.get(&current)?.value();
      if builder == me {
        chain.insert(0, current);
        return Some(chain);
      }
      current = self.waiting.get(&builder)?.value().clone();
      chain.push(current.clone());
    }
    None
  }
}

/// Removes `key` from `map` on drop, provided it still maps to `value`.
struct Claim<'a, K: Eq + Hash, V: PartialEq> {
  map: &'a DashMap<K, V>,
  key: K,
  value: V,
}

impl<'a, K: Eq + Hash, V: PartialEq> Claim<'a, K, V> {
  fn new(map: &'a DashMap<K, V>, key: K, value: V) -> Self {
    Self { map, key, value }
  }
}

impl<K: Eq + Hash, V: PartialEq> Drop for Claim<'_, K, V> {
  fn drop(&mut self) {
    self.map.remove_if(&self.key, |_, current| *current == self.value);
  }
}
