//! Parameter introspection.
//!
//! Rust has no runtime reflection, so everything the injector needs to know
//! about a class (its constructor parameters, how to call it, which types it
//! may stand in for) is described up front with a [`ClassDescriptor`] and
//! served through the [`Introspector`] trait. [`ClassCatalog`] is the stock,
//! thread-safe table of descriptors.

use crate::error::{Error, Result};
use crate::value::{Args, Instance, Value};
use dashmap::DashMap;
use std::any::{type_name, Any};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// The conventional name of a static factory used when a class's constructor
/// is not public.
pub const STATIC_FACTORY: &str = "instance";

pub(crate) type BuildFn = Arc<dyn Fn(&Args) -> Result<Instance> + Send + Sync>;
type StaticFn = Arc<dyn Fn(&Args) -> Result<Value> + Send + Sync>;
type BoundFn = Arc<dyn Fn(&Instance, &Args) -> Result<Value> + Send + Sync>;

/// Describes one declared parameter of a constructor, method or callable.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
  pub name: String,
  /// The declared class of an object parameter; `None` for scalars.
  pub declared_type: Option<String>,
  /// The declared default value, if any.
  pub default: Option<Value>,
}

impl ParamDescriptor {
  /// A non-object parameter.
  pub fn scalar(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      declared_type: None,
      default: None,
    }
  }

  /// An object parameter of the named class.
  pub fn object(name: impl Into<String>, class: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      declared_type: Some(class.into()),
      default: None,
    }
  }

  /// An object parameter whose class is the Rust type name of `T`.
  pub fn of<T: ?Sized + Any>(name: impl Into<String>) -> Self {
    Self::object(name, type_name::<T>())
  }

  pub fn with_default(mut self, default: impl Into<Value>) -> Self {
    self.default = Some(default.into());
    self
  }

  pub fn is_object(&self) -> bool {
    self.declared_type.is_some()
  }

  pub fn has_default(&self) -> bool {
    self.default.is_some()
  }
}

/// A free function or closure together with its parameter list.
#[derive(Clone)]
pub struct Callable {
  label: Arc<str>,
  params: Arc<[ParamDescriptor]>,
  body: StaticFn,
}

impl Callable {
  pub fn new<F>(label: impl Into<Arc<str>>, params: Vec<ParamDescriptor>, body: F) -> Self
  where
    F: Fn(&Args) -> Result<Value> + Send + Sync + 'static,
  {
    Self {
      label: label.into(),
      params: params.into(),
      body: Arc::new(body),
    }
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn params(&self) -> &[ParamDescriptor] {
    &self.params
  }

  pub fn invoke(&self, args: &Args) -> Result<Value> {
    (self.body)(args)
  }
}

impl fmt::Debug for Callable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Callable({})", self.label)
  }
}

#[derive(Clone)]
enum MethodBody {
  Static(StaticFn),
  Bound(BoundFn),
}

/// A method declared on a class, static or bound to a receiver.
#[derive(Clone)]
pub struct Method {
  name: String,
  params: Vec<ParamDescriptor>,
  body: MethodBody,
}

impl Method {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn params(&self) -> &[ParamDescriptor] {
    &self.params
  }

  pub fn is_static(&self) -> bool {
    matches!(self.body, MethodBody::Static(_))
  }

  /// Calls the method. Static methods take no receiver; bound methods
  /// require one.
  pub fn invoke(&self, receiver: Option<&Instance>, args: &Args) -> Result<Value> {
    match (&self.body, receiver) {
      (MethodBody::Static(body), None) => body(args),
      (MethodBody::Bound(body), Some(receiver)) => body(receiver, args),
      (MethodBody::Static(_), Some(_)) => Err(Error::InvalidCall(format!(
        "static method '{}' called with a receiver",
        self.name
      ))),
      (MethodBody::Bound(_), None) => Err(Error::InvalidCall(format!(
        "method '{}' called without a receiver",
        self.name
      ))),
    }
  }
}

impl fmt::Debug for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Method")
      .field("name", &self.name)
      .field("params", &self.params)
      .field("static", &self.is_static())
      .finish()
  }
}

/// How a class may be constructed directly.
#[derive(Clone)]
pub enum Constructor {
  Public {
    params: Vec<ParamDescriptor>,
    build: BuildFn,
  },
  /// Declared but not callable from outside; a static factory is needed.
  NonPublic,
}

impl fmt::Debug for Constructor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Constructor::Public { params, .. } => f.debug_struct("Public").field("params", params).finish(),
      Constructor::NonPublic => f.write_str("NonPublic"),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
  Concrete,
  Abstract,
  Interface,
}

/// Everything the injector knows about one class.
#[derive(Debug, Clone)]
pub struct ClassDescriptor {
  name: String,
  kind: ClassKind,
  supertypes: Vec<String>,
  constructor: Option<Constructor>,
  methods: HashMap<String, Method>,
}

impl ClassDescriptor {
  fn with_kind(name: impl Into<String>, kind: ClassKind) -> Self {
    Self {
      name: name.into(),
      kind,
      supertypes: Vec::new(),
      constructor: None,
      methods: HashMap::new(),
    }
  }

  pub fn concrete(name: impl Into<String>) -> Self {
    Self::with_kind(name, ClassKind::Concrete)
  }

  pub fn abstract_class(name: impl Into<String>) -> Self {
    Self::with_kind(name, ClassKind::Abstract)
  }

  pub fn interface(name: impl Into<String>) -> Self {
    Self::with_kind(name, ClassKind::Interface)
  }

  /// A concrete class named after the Rust type `T`.
  pub fn of<T: ?Sized + Any>() -> Self {
    Self::concrete(type_name::<T>())
  }

  /// Declares that instances of this class may stand in for `parent`.
  pub fn implements(mut self, parent: impl Into<String>) -> Self {
    self.supertypes.push(parent.into());
    self
  }

  /// Declares a public constructor.
  pub fn constructor<T, F>(mut self, params: Vec<ParamDescriptor>, build: F) -> Self
  where
    T: Any + Send + Sync,
    F: Fn(&Args) -> Result<T> + Send + Sync + 'static,
  {
    let class: Arc<str> = Arc::from(self.name.as_str());
    self.constructor = Some(Constructor::Public {
      params,
      build: Arc::new(move |args: &Args| {
        build(args).map(|object| Instance::new(Arc::clone(&class), object))
      }),
    });
    self
  }

  /// A public, parameterless constructor backed by `T::default()`.
  pub fn default_constructor<T: Default + Any + Send + Sync>(self) -> Self {
    self.constructor(Vec::new(), |_| Ok(T::default()))
  }

  pub fn non_public_constructor(mut self) -> Self {
    self.constructor = Some(Constructor::NonPublic);
    self
  }

  /// Declares the conventional static factory ([`STATIC_FACTORY`]).
  pub fn static_factory<T, F>(self, params: Vec<ParamDescriptor>, build: F) -> Self
  where
    T: Any + Send + Sync,
    F: Fn(&Args) -> Result<T> + Send + Sync + 'static,
  {
    let class: Arc<str> = Arc::from(self.name.as_str());
    self.static_method(STATIC_FACTORY, params, move |args| {
      build(args).map(|object| Value::Object(Instance::new(Arc::clone(&class), object)))
    })
  }

  pub fn static_method<F>(mut self, name: impl Into<String>, params: Vec<ParamDescriptor>, body: F) -> Self
  where
    F: Fn(&Args) -> Result<Value> + Send + Sync + 'static,
  {
    let name = name.into();
    let method = Method {
      name: name.clone(),
      params,
      body: MethodBody::Static(Arc::new(body)),
    };
    self.methods.insert(name, method);
    self
  }

  /// Declares a method called on a receiver of type `T`.
  pub fn method<T, F>(mut self, name: impl Into<String>, params: Vec<ParamDescriptor>, body: F) -> Self
  where
    T: Any + Send + Sync,
    F: Fn(&T, &Args) -> Result<Value> + Send + Sync + 'static,
  {
    let name = name.into();
    let label = format!("{}::{}", self.name, name);
    let bound = move |receiver: &Instance, args: &Args| {
      let this = receiver.downcast::<T>().ok_or_else(|| {
        Error::InvalidCall(format!(
          "receiver of '{label}' is an instance of '{}'",
          receiver.class()
        ))
      })?;
      body(&*this, args)
    };
    let method = Method {
      name: name.clone(),
      params,
      body: MethodBody::Bound(Arc::new(bound)),
    };
    self.methods.insert(name, method);
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn kind(&self) -> ClassKind {
    self.kind
  }

  pub fn is_abstract(&self) -> bool {
    self.kind != ClassKind::Concrete
  }

  pub fn supertypes(&self) -> &[String] {
    &self.supertypes
  }

  pub fn constructor_decl(&self) -> Option<&Constructor> {
    self.constructor.as_ref()
  }

  pub fn method_decl(&self, name: &str) -> Option<&Method> {
    self.methods.get(name)
  }

  /// True when the class can be built through a public constructor.
  pub fn is_instantiable(&self) -> bool {
    !self.is_abstract() && matches!(self.constructor, Some(Constructor::Public { .. }))
  }

  pub fn has_non_public_constructor(&self) -> bool {
    matches!(self.constructor, Some(Constructor::NonPublic))
  }

  /// The static [`STATIC_FACTORY`] method, if declared.
  pub fn static_factory_decl(&self) -> Option<&Method> {
    self.methods.get(STATIC_FACTORY).filter(|method| method.is_static())
  }
}

/// The introspection capability the injector consumes.
pub trait Introspector: Send + Sync {
  /// Describes `class`, or `None` if it is unknown.
  fn describe(&self, class: &str) -> Option<Arc<ClassDescriptor>>;

  /// True when instances of `class` may stand in for `of`, following
  /// declared supertypes transitively.
  fn is_subtype(&self, class: &str, of: &str) -> bool {
    if class == of {
      return true;
    }
    let mut pending = vec![class.to_owned()];
    let mut seen = HashSet::new();
    while let Some(current) = pending.pop() {
      if !seen.insert(current.clone()) {
        continue;
      }
      let Some(descriptor) = self.describe(&current) else {
        continue;
      };
      for parent in descriptor.supertypes() {
        if parent == of {
          return true;
        }
        pending.push(parent.clone());
      }
    }
    false
  }
}

/// A thread-safe registration table of class descriptors.
#[derive(Default)]
pub struct ClassCatalog {
  classes: DashMap<String, Arc<ClassDescriptor>>,
}

impl ClassCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Adds or replaces the descriptor for its class, returning the previous one.
  pub fn register(&self, descriptor: ClassDescriptor) -> Option<Arc<ClassDescriptor>> {
    self
      .classes
      .insert(descriptor.name.clone(), Arc::new(descriptor))
  }

  /// Builder-style [`ClassCatalog::register`].
  pub fn with(self, descriptor: ClassDescriptor) -> Self {
    self.register(descriptor);
    self
  }

  pub fn contains(&self, class: &str) -> bool {
    self.classes.contains_key(class)
  }

  pub fn remove(&self, class: &str) -> Option<Arc<ClassDescriptor>> {
    self.classes.remove(class).map(|(_, descriptor)| descriptor)
  }

  pub fn len(&self) -> usize {
    self.classes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.classes.is_empty()
  }
}

impl Introspector for ClassCatalog {
  fn describe(&self, class: &str) -> Option<Arc<ClassDescriptor>> {
    self.classes.get(class).map(|entry| Arc::clone(entry.value()))
  }
}
