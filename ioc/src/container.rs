//! The definition registry: identifiers, their definitions and the alias table.

use crate::definition::{Definition, Registration};
use crate::error::{Error, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// The registry of definitions.
///
/// This struct holds the definitions for all identifiers plus the synonym
/// table. It is thread-safe; all operations take `&self`. It holds no
/// resolution logic, see [`Injector`](crate::Injector) for that.
#[derive(Default)]
pub struct Container {
  definitions: DashMap<String, Arc<Definition>>,
  synonyms: DashMap<String, String>,
}

impl Container {
  /// Creates a new, empty `Container`.
  pub fn new() -> Self {
    Self::default()
  }

  // --- Registration ---

  /// Registers `definition` under `id`, filling unset fields with defaults.
  ///
  /// Re-registering an existing identifier only takes effect when the
  /// definition carries `replace(true)`. Without a flag the call is rejected
  /// with a warning ([`Registration::Conflict`]); with `replace(false)` it is
  /// silently skipped.
  pub fn register(&self, id: &str, definition: Definition) -> Result<Registration> {
    self.register_replacing(id, definition).map(|(outcome, _)| outcome)
  }

  /// Like [`register`](Self::register), also returning the definition a
  /// replacement displaced.
  pub(crate) fn register_replacing(
    &self,
    id: &str,
    definition: Definition,
  ) -> Result<(Registration, Option<Arc<Definition>>)> {
    if id.trim().is_empty() {
      return Err(Error::InvalidDefinition(format!(
        "empty identifier for class {:?}",
        definition.class
      )));
    }

    let mut definition = definition;
    if definition.class.is_none() {
      definition.class = Some(id.to_owned());
    }
    let synonym = definition.synonym.clone().filter(|synonym| synonym != id);
    let replace = definition.replace;

    let (outcome, previous) = match self.definitions.entry(id.to_owned()) {
      Entry::Vacant(slot) => {
        slot.insert(Arc::new(definition));
        (Registration::Added, None)
      }
      Entry::Occupied(mut slot) => match replace {
        Some(true) => {
          let previous = slot.insert(Arc::new(definition));
          (Registration::Replaced, Some(previous))
        }
        Some(false) => return Ok((Registration::Skipped, None)),
        None => {
          warn!(
            id,
            "identifier is already defined; remove it first or register with replace(true)"
          );
          return Ok((Registration::Conflict, None));
        }
      },
    };

    if let Some(stale) = previous.as_ref().and_then(|p| p.synonym.as_ref()) {
      self.synonyms.remove_if(stale, |_, target| target == id);
    }
    if let Some(synonym) = synonym {
      if self.definitions.contains_key(&synonym) {
        warn!(id, synonym = %synonym, "synonym is shadowed by a definition of the same name");
      }
      self.synonyms.insert(synonym, id.to_owned());
    }

    debug!(id, outcome = ?outcome, "registered definition");
    Ok((outcome, previous))
  }

  /// Registers every entry in order. Entries with an empty identifier are
  /// skipped.
  pub fn register_all<I, S>(&self, entries: I) -> Result<Vec<Registration>>
  where
    I: IntoIterator<Item = (S, Definition)>,
    S: AsRef<str>,
  {
    let mut outcomes = Vec::new();
    for (id, definition) in entries {
      let id = id.as_ref();
      if id.trim().is_empty() {
        warn!("skipping definition with an empty identifier");
        continue;
      }
      outcomes.push(self.register(id, definition)?);
    }
    Ok(outcomes)
  }

  // --- Lookup ---

  /// Looks up a definition by identifier, then by synonym.
  pub fn lookup(&self, id: &str) -> Option<Arc<Definition>> {
    self.entry(id).map(|(_, definition)| definition)
  }

  /// The identifier a definition is stored under, following one synonym hop.
  pub fn resolve_canonical(&self, id: &str) -> Option<String> {
    self.entry(id).map(|(canonical, _)| canonical)
  }

  /// The class a definition builds.
  pub fn class_of(&self, id: &str) -> Option<String> {
    self
      .lookup(id)
      .and_then(|definition| definition.class.clone())
  }

  pub fn contains(&self, id: &str) -> bool {
    self.entry(id).is_some()
  }

  pub(crate) fn entry(&self, id: &str) -> Option<(String, Arc<Definition>)> {
    if let Some(definition) = self.definitions.get(id) {
      return Some((id.to_owned(), Arc::clone(definition.value())));
    }
    let canonical = self.synonyms.get(id).map(|target| target.value().clone())?;
    let definition = self.definitions.get(&canonical).map(|d| Arc::clone(d.value()))?;
    Some((canonical, definition))
  }

  // --- Removal ---

  /// Removes the definition behind `id` (an identifier or a synonym) along
  /// with every synonym pointing at it. Unknown identifiers are a no-op.
  pub fn remove(&self, id: &str) -> Option<Arc<Definition>> {
    let Some(canonical) = self.resolve_canonical(id) else {
      self.synonyms.remove(id);
      return None;
    };
    let (_, definition) = self.definitions.remove(&canonical)?;
    self.synonyms.retain(|_, target| *target != canonical);
    debug!(id = %canonical, "removed definition");
    Some(definition)
  }

  // --- Inspection ---

  pub fn len(&self) -> usize {
    self.definitions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.definitions.is_empty()
  }

  /// All registered identifiers, in no particular order.
  pub fn identifiers(&self) -> Vec<String> {
    self
      .definitions
      .iter()
      .map(|entry| entry.key().clone())
      .collect()
  }
}
