//! # Fibre DI
//!
//! A definition-driven dependency injector for Rust.
//!
//! Fibre DI builds object graphs from *definitions* (recipes registered under
//! an identifier) and *class descriptors* (the declared parameters and
//! constructor of each class). Given a target and a set of caller overrides,
//! the injector decides for every parameter whether to use an override, a
//! registered object, a freshly built dependency, or a declared default, and
//! fails loudly when none applies.
//!
//! ## Core Concepts
//!
//! - **ClassCatalog**: the table of [`ClassDescriptor`]s, standing in for
//!   runtime reflection. Any [`Introspector`] implementation can replace it.
//! - **Definition**: how to obtain an instance for an identifier; binds an
//!   interface to a class, sets default dependencies, marks singletons,
//!   registers a synonym, or short-circuits construction with a reference or
//!   a factory.
//! - **Injector**: the resolver. Owns the definition [`Container`] and the
//!   [`SingletonCache`]; thread-safe.
//! - **Dependencies**: per-call overrides, by parameter name or position
//!   (see [`deps!`]).
//!
//! ## Quick Start
//!
//! ```
//! use fibre_di::{deps, ClassCatalog, ClassDescriptor, Definition, Injector, ParamDescriptor};
//! use std::sync::Arc;
//!
//! struct FileLogger {
//!   path: String,
//! }
//!
//! struct Mailer {
//!   logger: Arc<FileLogger>,
//!   retries: i64,
//! }
//!
//! let catalog = Arc::new(
//!   ClassCatalog::new()
//!     .with(ClassDescriptor::interface("Logger"))
//!     .with(
//!       ClassDescriptor::concrete("FileLogger")
//!         .implements("Logger")
//!         .constructor(
//!           vec![ParamDescriptor::scalar("path").with_default("/var/log/app.log")],
//!           |args| Ok(FileLogger { path: args.str("path")?.to_owned() }),
//!         ),
//!     )
//!     .with(ClassDescriptor::concrete("Mailer").constructor(
//!       vec![
//!         ParamDescriptor::object("logger", "Logger"),
//!         ParamDescriptor::scalar("retries"),
//!       ],
//!       |args| {
//!         Ok(Mailer {
//!           logger: args.instance::<FileLogger>("logger")?,
//!           retries: args.int("retries")?,
//!         })
//!       },
//!     )),
//! );
//!
//! let injector = Injector::new(catalog);
//! injector.add("Logger", Definition::of("FileLogger").singleton()).unwrap();
//!
//! let mailer = injector
//!   .make_as::<Mailer>("Mailer", &deps! { retries => 3 })
//!   .unwrap();
//! assert_eq!(mailer.retries, 3);
//! assert_eq!(mailer.logger.path, "/var/log/app.log");
//! ```

mod binder;
mod config;
mod container;
mod core;
mod definition;
mod describe;
mod error;
mod injector;
mod macros;
mod singletons;
mod value;

pub use binder::Binder;
pub use config::InjectorConfig;
pub use container::Container;
pub use definition::{Definition, Reference, Registration};
pub use describe::{
  Callable, ClassCatalog, ClassDescriptor, ClassKind, Constructor, Introspector, Method,
  ParamDescriptor, STATIC_FACTORY,
};
pub use error::{Error, Result};
pub use injector::{Injector, Resolved, Target, Thunk, INJECTOR_ID};
pub use singletons::SingletonCache;
pub use value::{Args, BindValue, DepKey, Dependencies, Instance, Value};
