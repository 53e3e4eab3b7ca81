//! The resolver: builds instances from definitions, callables and methods.

use crate::binder::Binder;
use crate::config::InjectorConfig;
use crate::container::Container;
use crate::core::{Frame, ResolutionGuard, Slot};
use crate::definition::{Definition, Reference, Registration};
use crate::describe::{Callable, Constructor, Introspector, Method};
use crate::error::{Error, Result};
use crate::singletons::SingletonCache;
use crate::value::{Args, Dependencies, Instance, Value};
use std::any::{type_name, Any};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, debug_span, warn};

static NEXT_INJECTOR_ID: AtomicU64 = AtomicU64::new(1);

/// The identifier a [shared](Injector::shared) injector resolves to itself
/// under.
pub const INJECTOR_ID: &str = "DependencyInjector";

/// What to resolve.
#[derive(Debug, Clone)]
pub enum Target {
  /// A class name or registered identifier (or one of its synonyms).
  Class(String),
  /// A free function or closure.
  Function(Callable),
  /// A method declared on a class.
  Method { class: String, method: String },
}

impl From<&str> for Target {
  fn from(id: &str) -> Self {
    Target::Class(id.to_owned())
  }
}

impl From<String> for Target {
  fn from(id: String) -> Self {
    Target::Class(id)
  }
}

impl From<Callable> for Target {
  fn from(callable: Callable) -> Self {
    Target::Function(callable)
  }
}

impl From<(&str, &str)> for Target {
  fn from((class, method): (&str, &str)) -> Self {
    Target::Method {
      class: class.to_owned(),
      method: method.to_owned(),
    }
  }
}

/// A zero-argument call with its arguments already bound. Invoking it again
/// re-runs the same call.
#[derive(Clone)]
pub struct Thunk {
  label: Arc<str>,
  call: Arc<dyn Fn() -> Result<Value> + Send + Sync>,
}

impl Thunk {
  fn new(label: impl Into<Arc<str>>, call: impl Fn() -> Result<Value> + Send + Sync + 'static) -> Self {
    Self {
      label: label.into(),
      call: Arc::new(call),
    }
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn invoke(&self) -> Result<Value> {
    (self.call)()
  }
}

impl fmt::Debug for Thunk {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Thunk({})", self.label)
  }
}

/// The result of [`Injector::resolve`].
#[derive(Debug, Clone)]
pub enum Resolved {
  Instance(Instance),
  /// The immediate result of a static method call.
  Value(Value),
  /// A bound call ready to run.
  Deferred(Thunk),
}

impl Resolved {
  pub fn into_instance(self) -> Option<Instance> {
    match self {
      Resolved::Instance(instance) => Some(instance),
      Resolved::Value(value) => value.into_instance(),
      Resolved::Deferred(_) => None,
    }
  }

  pub fn into_thunk(self) -> Option<Thunk> {
    match self {
      Resolved::Deferred(thunk) => Some(thunk),
      _ => None,
    }
  }

  /// The resolved value, running a deferred call if necessary.
  pub fn into_value(self) -> Result<Value> {
    match self {
      Resolved::Instance(instance) => Ok(Value::Object(instance)),
      Resolved::Value(value) => Ok(value),
      Resolved::Deferred(thunk) => thunk.invoke(),
    }
  }
}

/// The dependency injector.
///
/// An `Injector` owns a definition registry ([`Container`]) and a
/// [`SingletonCache`], and reads class descriptions from an
/// [`Introspector`]. It is `Send + Sync`; share it behind an `Arc` to resolve
/// from several threads.
///
/// An injector built with [`Injector::shared`] also resolves itself under
/// [`INJECTOR_ID`], so classes may declare it as a parameter.
pub struct Injector {
  id: u64,
  this: Weak<Injector>,
  config: InjectorConfig,
  container: Container,
  singletons: SingletonCache,
  introspector: Arc<dyn Introspector>,
}

impl Injector {
  /// Creates an injector with the default configuration.
  pub fn new(introspector: Arc<dyn Introspector>) -> Self {
    Self::with_config(introspector, InjectorConfig::default())
  }

  pub fn with_config(introspector: Arc<dyn Introspector>, config: InjectorConfig) -> Self {
    Self::construct(introspector, config, Weak::new())
  }

  /// Creates an `Arc`-owned injector that resolves [`INJECTOR_ID`] to
  /// itself. It holds only a weak reference to itself, so dropping the last
  /// outside `Arc` frees it.
  pub fn shared(introspector: Arc<dyn Introspector>, config: InjectorConfig) -> Arc<Self> {
    Arc::new_cyclic(|this| Self::construct(introspector, config, this.clone()))
  }

  fn construct(introspector: Arc<dyn Introspector>, config: InjectorConfig, this: Weak<Injector>) -> Self {
    Self {
      id: NEXT_INJECTOR_ID.fetch_add(1, Ordering::Relaxed),
      this,
      config,
      container: Container::new(),
      singletons: SingletonCache::new(),
      introspector,
    }
  }

  pub fn config(&self) -> &InjectorConfig {
    &self.config
  }

  pub fn container(&self) -> &Container {
    &self.container
  }

  pub fn singletons(&self) -> &SingletonCache {
    &self.singletons
  }

  pub fn introspector(&self) -> &dyn Introspector {
    self.introspector.as_ref()
  }

  // --- Registration ---

  /// Registers a definition. Replacing a definition also drops the singleton
  /// cached for the class it used to build.
  pub fn add(&self, id: &str, definition: Definition) -> Result<Registration> {
    let (outcome, previous) = self.container.register_replacing(id, definition)?;
    if let Some(class) = previous.as_deref().and_then(Definition::class_name) {
      self.singletons.remove(class);
    }
    Ok(outcome)
  }

  pub fn add_list<I, S>(&self, entries: I) -> Result<Vec<Registration>>
  where
    I: IntoIterator<Item = (S, Definition)>,
    S: AsRef<str>,
  {
    entries
      .into_iter()
      .filter(|(id, _)| {
        let empty = id.as_ref().trim().is_empty();
        if empty {
          warn!("skipping definition with an empty identifier");
        }
        !empty
      })
      .map(|(id, definition)| self.add(id.as_ref(), definition))
      .collect()
  }

  pub fn has(&self, id: &str) -> bool {
    self.container.contains(id) || (id == INJECTOR_ID && self.this.strong_count() > 0)
  }

  pub fn get_definition(&self, id: &str) -> Option<Arc<Definition>> {
    self.container.lookup(id)
  }

  pub fn get_class(&self, id: &str) -> Option<String> {
    self.container.class_of(id)
  }

  /// Removes the definition behind `id`, its synonyms and its cached
  /// singleton.
  pub fn remove(&self, id: &str) -> Option<Arc<Definition>> {
    let definition = self.container.remove(id)?;
    if let Some(class) = definition.class_name() {
      self.singletons.remove(class);
    }
    Some(definition)
  }

  // --- Resolution ---

  /// Resolves any [`Target`].
  ///
  /// Classes resolve to an instance. Functions resolve to a deferred call with
  /// bound arguments. Static methods are called immediately; instance methods
  /// resolve their receiver and return a deferred call.
  pub fn resolve(&self, target: impl Into<Target>, overrides: &Dependencies) -> Result<Resolved> {
    match target.into() {
      Target::Class(id) => self.make_with(&id, overrides).map(Resolved::Instance),
      Target::Function(callable) => self.defer(&callable, overrides).map(Resolved::Deferred),
      Target::Method { class, method } => self.call_method(&class, &method, overrides),
    }
  }

  pub fn make(&self, id: &str) -> Result<Instance> {
    self.make_with(id, &Dependencies::new())
  }

  /// Resolves an instance for `id`, with `overrides` layered over the
  /// definition's own dependencies for this call only.
  pub fn make_with(&self, id: &str, overrides: &Dependencies) -> Result<Instance> {
    if id == INJECTOR_ID {
      if let Some(this) = self.this.upgrade() {
        return Ok(Instance::from_arc(INJECTOR_ID, this));
      }
    }
    let (canonical, definition) = self.definition_for(id)?;
    let _span = debug_span!("resolve", id = %canonical).entered();
    let _guard = self.enter(Slot::Resolve(canonical.clone()))?;

    let class = definition.class_name().unwrap_or(&canonical).to_owned();
    let dependencies = definition.deps().merged_with(overrides);

    if let Some(factory) = definition.factory_decl() {
      let value = self.call(factory, &dependencies)?;
      return expect_instance(&canonical, value);
    }

    if !definition.is_singleton() {
      return self.build(&class, &definition, &dependencies, overrides);
    }
    if let Some(instance) = self.singletons.get(&class) {
      return Ok(instance);
    }

    let _cell_guard = self.enter(Slot::Singleton(class.clone()))?;
    self.singletons.get_or_try_init(&class, || {
      debug!(class = %class, "constructing singleton");
      self.build(&class, &definition, &dependencies, overrides)
    })
  }

  /// Resolves `id` and downcasts the instance to `T`.
  pub fn make_as<T: Any + Send + Sync>(&self, id: &str, overrides: &Dependencies) -> Result<Arc<T>> {
    let instance = self.make_with(id, overrides)?;
    instance.downcast::<T>().ok_or_else(|| Error::NotAnInstance {
      target: id.to_owned(),
      found: instance.class().to_owned(),
    })
  }

  /// Resolves the class named after the Rust type `T`.
  pub fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
    self.make_as::<T>(type_name::<T>(), &Dependencies::new())
  }

  /// Binds `callable`'s parameters and calls it immediately.
  pub fn call(&self, callable: &Callable, overrides: &Dependencies) -> Result<Value> {
    let args = self.bind_function_args(callable, overrides)?;
    callable.invoke(&args)
  }

  /// Binds `callable`'s parameters now and returns a thunk running the call.
  pub fn defer(&self, callable: &Callable, overrides: &Dependencies) -> Result<Thunk> {
    let args = self.bind_function_args(callable, overrides)?;
    let label: Arc<str> = Arc::from(callable.label());
    let callable = callable.clone();
    Ok(Thunk::new(label, move || callable.invoke(&args)))
  }

  /// Calls `class::method`. Static methods run immediately. Instance methods
  /// resolve a receiver of `class` and return a thunk calling the method on
  /// it.
  pub fn call_method(&self, class: &str, method: &str, overrides: &Dependencies) -> Result<Resolved> {
    let declared = self.method_decl(class, method)?;
    let label = format!("{class}::{method}");
    let args = Binder::new(self).bind(declared.params(), overrides, Some(label.as_str()))?;
    if declared.is_static() {
      return declared.invoke(None, &args).map(Resolved::Value);
    }
    let receiver = self.make(class)?;
    Ok(Resolved::Deferred(Thunk::new(label, move || {
      declared.invoke(Some(&receiver), &args)
    })))
  }

  /// The arguments `callable` would be called with, without calling it.
  pub fn bind_function_args(&self, callable: &Callable, deps: &Dependencies) -> Result<Args> {
    Binder::new(self).bind(callable.params(), deps, Some(callable.label()))
  }

  /// The arguments `class::method` would be called with, without calling it.
  pub fn bind_method_args(&self, class: &str, method: &str, deps: &Dependencies) -> Result<Args> {
    let declared = self.method_decl(class, method)?;
    Binder::new(self).bind(declared.params(), deps, Some(class))
  }

  // --- Internals ---

  /// Builds an instance of `class` from its descriptor: through its public
  /// constructor, or through its static factory when the constructor is not
  /// public. Nothing is registered.
  pub(crate) fn instantiate(&self, class: &str, deps: &Dependencies) -> Result<Instance> {
    let descriptor = self
      .introspector
      .describe(class)
      .ok_or_else(|| Error::UnknownIdentifier(class.to_owned()))?;
    if descriptor.is_abstract() {
      return Err(Error::UnresolvableAbstractType {
        class: class.to_owned(),
      });
    }

    let binder = Binder::new(self);
    if let Some(Constructor::Public { params, build }) = descriptor.constructor_decl() {
      let args = binder.bind(params, deps, Some(class))?;
      return build(&args);
    }
    match descriptor.static_factory_decl() {
      Some(factory) => {
        let args = binder.bind(factory.params(), deps, Some(class))?;
        expect_instance(class, factory.invoke(None, &args)?)
      }
      None => Err(Error::NotInstantiable {
        class: class.to_owned(),
      }),
    }
  }

  pub(crate) fn is_compatible(&self, instance: &Instance, class: &str) -> bool {
    self.introspector.is_subtype(instance.class(), class)
  }

  fn build(
    &self,
    class: &str,
    definition: &Definition,
    dependencies: &Dependencies,
    overrides: &Dependencies,
  ) -> Result<Instance> {
    match definition.reference_decl() {
      Some(Reference::Instance(instance)) if self.is_compatible(instance, class) => {
        return Ok(instance.clone());
      }
      Some(Reference::Instance(instance)) => {
        warn!(class, found = instance.class(), "reference is not an instance of its class; constructing instead");
      }
      Some(Reference::Alias(alias)) if self.container.contains(alias) => {
        return self.make(alias);
      }
      Some(Reference::Alias(alias)) => {
        warn!(class, alias = %alias, "reference names an unknown identifier; constructing instead");
      }
      Some(Reference::Factory(factory)) => {
        let value = self.call(factory, overrides)?;
        return expect_instance(class, value);
      }
      None => {}
    }
    self.instantiate(class, dependencies)
  }

  /// Finds the definition for `id`, synthesizing and registering a default
  /// one for known concrete classes.
  fn definition_for(&self, id: &str) -> Result<(String, Arc<Definition>)> {
    if let Some(entry) = self.container.entry(id) {
      return Ok(entry);
    }
    let descriptor = match self.introspector.describe(id) {
      Some(descriptor) if self.config.auto_register => descriptor,
      _ => return Err(Error::UnknownIdentifier(id.to_owned())),
    };
    if descriptor.is_abstract() {
      return Err(Error::UnresolvableAbstractType {
        class: id.to_owned(),
      });
    }
    debug!(id, "registering default definition");
    self.container.register(id, Definition::new().replace(false))?;
    self
      .container
      .entry(id)
      .ok_or_else(|| Error::UnknownIdentifier(id.to_owned()))
  }

  fn method_decl(&self, class: &str, method: &str) -> Result<Method> {
    self
      .introspector
      .describe(class)
      .and_then(|descriptor| descriptor.method_decl(method).cloned())
      .ok_or_else(|| Error::UnknownMethod {
        class: class.to_owned(),
        method: method.to_owned(),
      })
  }

  fn enter(&self, slot: Slot) -> Result<ResolutionGuard> {
    let frame = Frame {
      injector: self.id,
      slot,
    };
    ResolutionGuard::enter(frame, self.config.max_depth)
  }
}

fn expect_instance(target: &str, value: Value) -> Result<Instance> {
  match value {
    Value::Object(instance) => Ok(instance),
    other => Err(Error::NotAnInstance {
      target: target.to_owned(),
      found: other.kind().to_owned(),
    }),
  }
}
