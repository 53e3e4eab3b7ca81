//! Public macros for building dependency maps and resolving services.

/// Builds a [`Dependencies`](crate::Dependencies) map.
///
/// Named entries are written `name => value` (an identifier or a string
/// literal), positional entries `[index] => value`.
///
/// # Examples
///
/// ```
/// use fibre_di::{deps, BindValue};
///
/// let deps = deps! {
///   count => 3,
///   "log-level" => "debug",
///   [0] => BindValue::id("App\\FileLogger"),
/// };
/// assert_eq!(deps.len(), 3);
/// assert!(deps.get_named("count").is_some());
/// assert!(deps.get_at(0).is_some());
/// ```
#[macro_export]
macro_rules! deps {
  () => {
    $crate::Dependencies::new()
  };
  ($($entry:tt)+) => {{
    let mut deps = $crate::Dependencies::new();
    $crate::__deps_entries!(deps; $($entry)+);
    deps
  }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __deps_entries {
  ($deps:ident;) => {};
  ($deps:ident; [$index:expr] => $value:expr $(, $($rest:tt)*)?) => {
    $deps.insert_at($index, $value);
    $crate::__deps_entries!($deps; $($($rest)*)?);
  };
  ($deps:ident; $name:ident => $value:expr $(, $($rest:tt)*)?) => {
    $deps.insert_named(stringify!($name), $value);
    $crate::__deps_entries!($deps; $($($rest)*)?);
  };
  ($deps:ident; $name:literal => $value:expr $(, $($rest:tt)*)?) => {
    $deps.insert_named($name, $value);
    $crate::__deps_entries!($deps; $($($rest)*)?);
  };
}

/// Resolves a service from an injector and downcasts it.
///
/// This macro panics if the service cannot be resolved. For a non-panicking
/// version, use [`Injector::make_as`](crate::Injector::make_as) or
/// [`Injector::get`](crate::Injector::get) directly.
///
/// - `make!(injector, Type)` resolves the class named after `Type`.
/// - `make!(injector, Type, "id")` resolves identifier `"id"` as a `Type`.
/// - `make!(injector, Type, "id", deps)` does the same with overrides.
///
/// # Panics
///
/// Panics with the resolution error if the service cannot be built.
#[macro_export]
macro_rules! make {
  ($injector:expr, $type:ty) => {
    $injector.get::<$type>().unwrap_or_else(|error| {
      panic!(
        "Failed to resolve required service {}: {}",
        std::any::type_name::<$type>(),
        error
      )
    })
  };

  ($injector:expr, $type:ty, $id:expr) => {
    $crate::make!($injector, $type, $id, &$crate::Dependencies::new())
  };

  ($injector:expr, $type:ty, $id:expr, $deps:expr) => {
    $injector
      .make_as::<$type>($id, $deps)
      .unwrap_or_else(|error| {
        panic!(
          "Failed to resolve required service '{}' as {}: {}",
          $id,
          std::any::type_name::<$type>(),
          error
        )
      })
  };
}
