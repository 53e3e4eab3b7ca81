//! Values that flow through the injector: shared instances, literal values,
//! bind values supplied by callers and the argument lists handed to
//! constructors.

use crate::describe::Callable;
use crate::error::{Error, Result};
use std::any::{type_name, Any};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// A shared, type-erased object tagged with the class it was built as.
///
/// Cloning an `Instance` shares the underlying object.
#[derive(Clone)]
pub struct Instance {
  class: Arc<str>,
  object: Arc<dyn Any + Send + Sync>,
}

impl Instance {
  /// Wraps `object` as an instance of `class`.
  pub fn new<T: Any + Send + Sync>(class: impl Into<Arc<str>>, object: T) -> Self {
    Self::from_arc(class, Arc::new(object))
  }

  /// Wraps an already shared object as an instance of `class`.
  pub fn from_arc<T: Any + Send + Sync>(class: impl Into<Arc<str>>, object: Arc<T>) -> Self {
    Self {
      class: class.into(),
      object,
    }
  }

  /// Wraps `object` using its Rust type name as the class.
  pub fn of<T: Any + Send + Sync>(object: T) -> Self {
    Self::new(type_name::<T>(), object)
  }

  pub fn class(&self) -> &str {
    &self.class
  }

  pub fn is<T: Any>(&self) -> bool {
    self.object.is::<T>()
  }

  /// Returns the shared object if it is a `T`.
  pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
    Arc::clone(&self.object).downcast::<T>().ok()
  }

  /// True when both instances share the same object.
  pub fn ptr_eq(&self, other: &Instance) -> bool {
    Arc::ptr_eq(&self.object, &other.object)
  }
}

impl PartialEq for Instance {
  fn eq(&self, other: &Self) -> bool {
    self.ptr_eq(other)
  }
}

impl fmt::Debug for Instance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Instance({})", self.class)
  }
}

/// A value carried by an argument slot or returned from a callable.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
  #[default]
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
  List(Vec<Value>),
  Object(Instance),
}

impl Value {
  /// A short name of the value's kind, used in error messages.
  pub fn kind(&self) -> &'static str {
    match self {
      Value::Null => "null",
      Value::Bool(_) => "bool",
      Value::Int(_) => "int",
      Value::Float(_) => "float",
      Value::Str(_) => "string",
      Value::List(_) => "list",
      Value::Object(_) => "object",
    }
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_int(&self) -> Option<i64> {
    match self {
      Value::Int(i) => Some(*i),
      _ => None,
    }
  }

  /// Integers widen to floats.
  pub fn as_float(&self) -> Option<f64> {
    match self {
      Value::Float(f) => Some(*f),
      Value::Int(i) => Some(*i as f64),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Str(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_instance(&self) -> Option<&Instance> {
    match self {
      Value::Object(instance) => Some(instance),
      _ => None,
    }
  }

  pub fn into_instance(self) -> Option<Instance> {
    match self {
      Value::Object(instance) => Some(instance),
      _ => None,
    }
  }

  fn describe(&self) -> String {
    match self {
      Value::Object(instance) => format!("object of class '{}'", instance.class()),
      other => other.kind().to_owned(),
    }
  }
}

macro_rules! value_from {
  ($($source:ty => $variant:ident $(as $cast:ty)?),+ $(,)?) => {
    $(
      impl From<$source> for Value {
        fn from(value: $source) -> Self {
          Value::$variant(value $(as $cast)?)
        }
      }
    )+
  };
}

value_from! {
  bool => Bool,
  i32 => Int as i64,
  i64 => Int,
  u32 => Int as i64,
  f64 => Float,
  String => Str,
  Vec<Value> => List,
  Instance => Object,
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::Str(value.to_owned())
  }
}

impl From<()> for Value {
  fn from(_: ()) -> Self {
    Value::Null
  }
}

/// A caller-supplied binding for one parameter.
#[derive(Debug, Clone)]
pub enum BindValue {
  /// Used verbatim. A string literal bound to an object parameter is read as
  /// an identifier.
  Literal(Value),
  /// A registry identifier or class name to resolve.
  Identifier(String),
  /// A pre-built object.
  Instance(Instance),
  /// A callable invoked, with injection, to produce the value.
  Factory(Callable),
}

impl BindValue {
  /// Binds a registry identifier or class name.
  pub fn id(identifier: impl Into<String>) -> Self {
    BindValue::Identifier(identifier.into())
  }

  /// The identifier this value names when bound to an object parameter.
  pub fn as_identifier(&self) -> Option<&str> {
    match self {
      BindValue::Identifier(id) => Some(id),
      BindValue::Literal(Value::Str(id)) => Some(id),
      _ => None,
    }
  }
}

macro_rules! bind_value_from {
  ($($source:ty),+ $(,)?) => {
    $(
      impl From<$source> for BindValue {
        fn from(value: $source) -> Self {
          BindValue::Literal(Value::from(value))
        }
      }
    )+
  };
}

bind_value_from!(bool, i32, i64, u32, f64, String, &str, Vec<Value>, ());

impl From<Value> for BindValue {
  fn from(value: Value) -> Self {
    match value {
      Value::Object(instance) => BindValue::Instance(instance),
      other => BindValue::Literal(other),
    }
  }
}

impl From<Instance> for BindValue {
  fn from(instance: Instance) -> Self {
    BindValue::Instance(instance)
  }
}

impl From<Callable> for BindValue {
  fn from(callable: Callable) -> Self {
    BindValue::Factory(callable)
  }
}

/// The key of a dependency entry: a parameter name or a position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DepKey {
  Name(String),
  Index(usize),
}

impl From<&str> for DepKey {
  fn from(name: &str) -> Self {
    DepKey::Name(name.to_owned())
  }
}

impl From<String> for DepKey {
  fn from(name: String) -> Self {
    DepKey::Name(name)
  }
}

impl From<usize> for DepKey {
  fn from(index: usize) -> Self {
    DepKey::Index(index)
  }
}

/// A dependency map: named and positional bindings for a target's parameters.
#[derive(Debug, Clone, Default)]
pub struct Dependencies {
  named: HashMap<String, BindValue>,
  positional: BTreeMap<usize, BindValue>,
}

impl Dependencies {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder form of [`Dependencies::insert_named`].
  pub fn named(mut self, name: impl Into<String>, value: impl Into<BindValue>) -> Self {
    self.insert_named(name, value);
    self
  }

  /// Builder form of [`Dependencies::insert_at`].
  pub fn at(mut self, index: usize, value: impl Into<BindValue>) -> Self {
    self.insert_at(index, value);
    self
  }

  pub fn insert(&mut self, key: impl Into<DepKey>, value: impl Into<BindValue>) {
    match key.into() {
      DepKey::Name(name) => self.insert_named(name, value),
      DepKey::Index(index) => self.insert_at(index, value),
    }
  }

  pub fn insert_named(&mut self, name: impl Into<String>, value: impl Into<BindValue>) {
    self.named.insert(name.into(), value.into());
  }

  pub fn insert_at(&mut self, index: usize, value: impl Into<BindValue>) {
    self.positional.insert(index, value.into());
  }

  pub fn get(&self, key: &DepKey) -> Option<&BindValue> {
    match key {
      DepKey::Name(name) => self.named.get(name),
      DepKey::Index(index) => self.positional.get(index),
    }
  }

  pub fn get_named(&self, name: &str) -> Option<&BindValue> {
    self.named.get(name)
  }

  pub fn get_at(&self, index: usize) -> Option<&BindValue> {
    self.positional.get(&index)
  }

  pub fn len(&self) -> usize {
    self.named.len() + self.positional.len()
  }

  pub fn is_empty(&self) -> bool {
    self.named.is_empty() && self.positional.is_empty()
  }

  /// Returns a new map holding `self` overlaid with `overrides`; entries in
  /// `overrides` win on key collision. Neither input is modified.
  pub fn merged_with(&self, overrides: &Dependencies) -> Dependencies {
    if overrides.is_empty() {
      return self.clone();
    }
    let mut merged = self.clone();
    for (name, value) in &overrides.named {
      merged.named.insert(name.clone(), value.clone());
    }
    for (index, value) in &overrides.positional {
      merged.positional.insert(*index, value.clone());
    }
    merged
  }
}

impl<K: Into<DepKey>, V: Into<BindValue>> FromIterator<(K, V)> for Dependencies {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut deps = Dependencies::new();
    for (key, value) in iter {
      deps.insert(key, value);
    }
    deps
  }
}

/// The bound argument list handed to a constructor, method or callable, in
/// parameter declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
  entries: Vec<(String, Value)>,
}

impl Args {
  pub fn new() -> Self {
    Self::default()
  }

  pub(crate) fn with_capacity(capacity: usize) -> Self {
    Self {
      entries: Vec::with_capacity(capacity),
    }
  }

  pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
    self.entries.push((name.into(), value.into()));
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
    self.entries.iter().map(|(name, value)| (name.as_str(), value))
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(name, _)| name.as_str())
  }

  pub fn value(&self, name: &str) -> Option<&Value> {
    self
      .entries
      .iter()
      .find(|(entry, _)| entry == name)
      .map(|(_, value)| value)
  }

  pub fn at(&self, position: usize) -> Option<&Value> {
    self.entries.get(position).map(|(_, value)| value)
  }

  /// The value bound to `name`, failing with `MissingArgument` if absent.
  pub fn require(&self, name: &str) -> Result<&Value> {
    self.value(name).ok_or_else(|| Error::MissingArgument {
      parameter: name.to_owned(),
      owner: None,
    })
  }

  pub fn bool(&self, name: &str) -> Result<bool> {
    let value = self.require(name)?;
    value.as_bool().ok_or_else(|| mismatch(name, "bool", value))
  }

  pub fn int(&self, name: &str) -> Result<i64> {
    let value = self.require(name)?;
    value.as_int().ok_or_else(|| mismatch(name, "int", value))
  }

  pub fn float(&self, name: &str) -> Result<f64> {
    let value = self.require(name)?;
    value.as_float().ok_or_else(|| mismatch(name, "float", value))
  }

  pub fn str(&self, name: &str) -> Result<&str> {
    let value = self.require(name)?;
    value.as_str().ok_or_else(|| mismatch(name, "string", value))
  }

  pub fn object(&self, name: &str) -> Result<&Instance> {
    let value = self.require(name)?;
    value.as_instance().ok_or_else(|| mismatch(name, "object", value))
  }

  /// The object bound to `name`, downcast to `T`.
  pub fn instance<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
    let value = self.require(name)?;
    value
      .as_instance()
      .and_then(Instance::downcast::<T>)
      .ok_or_else(|| mismatch(name, type_name::<T>(), value))
  }
}

fn mismatch(parameter: &str, expected: &'static str, found: &Value) -> Error {
  Error::ArgumentType {
    parameter: parameter.to_owned(),
    expected,
    found: found.describe(),
  }
}
