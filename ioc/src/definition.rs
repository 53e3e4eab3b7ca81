//! Definitions: the stored recipes describing how to obtain an instance for
//! an identifier.

use crate::describe::Callable;
use crate::value::{Dependencies, Instance};

/// A short-circuit that replaces normal construction.
#[derive(Debug, Clone)]
pub enum Reference {
  /// Returned verbatim, provided it is an instance of the definition's class.
  Instance(Instance),
  /// Another registered identifier to resolve instead.
  Alias(String),
  /// Called, with injection, to produce the instance.
  Factory(Callable),
}

/// How to build (or obtain) the instance registered under an identifier.
///
/// Unset fields are filled in on registration: the class defaults to the
/// registration identifier, dependencies to an empty map, and the definition
/// is transient unless [`Definition::singleton`] is called.
#[derive(Debug, Clone, Default)]
pub struct Definition {
  pub(crate) class: Option<String>,
  pub(crate) dependencies: Dependencies,
  pub(crate) singleton: bool,
  pub(crate) synonym: Option<String>,
  pub(crate) reference: Option<Reference>,
  pub(crate) factory: Option<Callable>,
  pub(crate) replace: Option<bool>,
}

impl Definition {
  pub fn new() -> Self {
    Self::default()
  }

  /// A definition building `class`, typically used to bind an interface
  /// identifier to a concrete implementation.
  pub fn of(class: impl Into<String>) -> Self {
    Self::new().class(class)
  }

  pub fn class(mut self, class: impl Into<String>) -> Self {
    self.class = Some(class.into());
    self
  }

  /// Default bindings applied on every resolution; caller overrides win.
  pub fn dependencies(mut self, dependencies: Dependencies) -> Self {
    self.dependencies = dependencies;
    self
  }

  pub fn singleton(mut self) -> Self {
    self.singleton = true;
    self
  }

  /// Registers `synonym` as an alias of this definition's identifier.
  pub fn synonym(mut self, synonym: impl Into<String>) -> Self {
    self.synonym = Some(synonym.into());
    self
  }

  pub fn reference(mut self, reference: Reference) -> Self {
    self.reference = Some(reference);
    self
  }

  /// Shorthand for `reference(Reference::Instance(..))`.
  pub fn instance(self, instance: Instance) -> Self {
    self.reference(Reference::Instance(instance))
  }

  /// Shorthand for `reference(Reference::Alias(..))`.
  pub fn alias_of(self, identifier: impl Into<String>) -> Self {
    self.reference(Reference::Alias(identifier.into()))
  }

  /// Builds through `factory` instead of the class's constructor. The factory
  /// bypasses the singleton cache.
  pub fn factory(mut self, factory: Callable) -> Self {
    self.factory = Some(factory);
    self
  }

  /// The explicit override flag for re-registration: `true` replaces an
  /// existing definition, `false` silently keeps it.
  pub fn replace(mut self, replace: bool) -> Self {
    self.replace = Some(replace);
    self
  }

  pub fn class_name(&self) -> Option<&str> {
    self.class.as_deref()
  }

  pub fn deps(&self) -> &Dependencies {
    &self.dependencies
  }

  pub fn is_singleton(&self) -> bool {
    self.singleton
  }

  pub fn synonym_name(&self) -> Option<&str> {
    self.synonym.as_deref()
  }

  pub fn reference_decl(&self) -> Option<&Reference> {
    self.reference.as_ref()
  }

  pub fn factory_decl(&self) -> Option<&Callable> {
    self.factory.as_ref()
  }
}

/// The outcome of registering a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
  Added,
  /// An existing definition was replaced (`replace(true)`).
  Replaced,
  /// The identifier was already defined and no override flag was given; the
  /// call was a no-op and a warning was logged.
  Conflict,
  /// The identifier was already defined and `replace(false)` was given.
  Skipped,
}
