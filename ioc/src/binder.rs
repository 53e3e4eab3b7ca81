//! The parameter binder: matches declared parameters against a dependency
//! map and produces the argument list for a call.

use crate::describe::ParamDescriptor;
use crate::error::{Error, Result};
use crate::injector::Injector;
use crate::value::{Args, BindValue, Dependencies, Value};
use tracing::trace;

/// Turns parameter descriptors plus caller bindings into concrete arguments,
/// resolving object parameters through the injector where needed.
///
/// Parameters are matched, in declaration order, by name first and then by
/// position, using a cursor over the positional entries. Object parameters
/// the caller leaves unbound are built by the injector. Scalars are never
/// invented: they come from a binding or a declared default, or binding fails
/// with [`Error::MissingArgument`].
pub struct Binder<'a> {
  injector: &'a Injector,
}

impl<'a> Binder<'a> {
  pub fn new(injector: &'a Injector) -> Self {
    Self { injector }
  }

  /// Binds `params` against `deps`. `owner` names the class or callable the
  /// parameters belong to, for error messages.
  pub fn bind(
    &self,
    params: &[ParamDescriptor],
    deps: &Dependencies,
    owner: Option<&str>,
  ) -> Result<Args> {
    let mut args = Args::with_capacity(params.len());
    let mut cursor = 0;
    for param in params {
      let value = self.bind_param(param, deps, &mut cursor, owner)?;
      args.push(param.name.clone(), value);
    }
    Ok(args)
  }

  fn bind_param(
    &self,
    param: &ParamDescriptor,
    deps: &Dependencies,
    cursor: &mut usize,
    owner: Option<&str>,
  ) -> Result<Value> {
    if let Some(bound) = deps.get_named(&param.name) {
      trace!(parameter = %param.name, "bound by name");
      *cursor += 1;
      return self.bind_named(param, bound);
    }

    let candidate = deps.get_at(*cursor);

    let Some(declared) = param.declared_type.as_deref() else {
      if let Some(bound) = candidate {
        trace!(parameter = %param.name, position = *cursor, "scalar bound by position");
        *cursor += 1;
        return self.scalar(bound);
      }
      return self.fallback(param, owner);
    };

    match candidate {
      Some(BindValue::Instance(instance)) if self.injector.is_compatible(instance, declared) => {
        trace!(parameter = %param.name, position = *cursor, "instance bound by position");
        *cursor += 1;
        return Ok(Value::Object(instance.clone()));
      }
      Some(BindValue::Factory(factory)) => match self.injector.call(factory, &Dependencies::new())? {
        Value::Object(instance) if self.injector.is_compatible(&instance, declared) => {
          trace!(parameter = %param.name, position = *cursor, "factory bound by position");
          *cursor += 1;
          return Ok(Value::Object(instance));
        }
        other => {
          trace!(
            parameter = %param.name,
            found = other.kind(),
            "factory result does not match the declared type"
          );
        }
      },
      Some(bound) => {
        if let Some(id) = bound.as_identifier() {
          trace!(parameter = %param.name, id, "identifier bound by position");
          *cursor += 1;
          return self.resolve_identifier(id);
        }
      }
      None => {}
    }

    if !param.has_default() || (candidate.is_none() && self.injector.has(declared)) {
      trace!(parameter = %param.name, class = declared, "auto-wiring");
      return self
        .injector
        .make_with(declared, &Dependencies::new())
        .map(Value::Object);
    }

    self.fallback(param, owner)
  }

  fn bind_named(&self, param: &ParamDescriptor, bound: &BindValue) -> Result<Value> {
    if param.is_object() {
      if let Some(id) = bound.as_identifier() {
        return self.resolve_identifier(id);
      }
    }
    self.scalar(bound)
  }

  /// Resolves `id` through the registry when it is registered, otherwise
  /// constructs the class of that name without caller bindings.
  fn resolve_identifier(&self, id: &str) -> Result<Value> {
    let instance = if self.injector.has(id) {
      self.injector.make(id)?
    } else {
      self.injector.instantiate(id, &Dependencies::new())?
    };
    Ok(Value::Object(instance))
  }

  fn scalar(&self, bound: &BindValue) -> Result<Value> {
    match bound {
      BindValue::Literal(value) => Ok(value.clone()),
      BindValue::Identifier(id) => Ok(Value::Str(id.clone())),
      BindValue::Instance(instance) => Ok(Value::Object(instance.clone())),
      BindValue::Factory(factory) => self.injector.call(factory, &Dependencies::new()),
    }
  }

  fn fallback(&self, param: &ParamDescriptor, owner: Option<&str>) -> Result<Value> {
    match &param.default {
      Some(default) => Ok(default.clone()),
      None => Err(Error::MissingArgument {
        parameter: param.name.clone(),
        owner: owner.map(str::to_owned),
      }),
    }
  }
}
