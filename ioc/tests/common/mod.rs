// Shared class descriptors for the integration tests.
#![allow(dead_code)]

use fibre_di::{ClassCatalog, ClassDescriptor, Injector, Instance, ParamDescriptor};
use std::sync::Arc;

#[derive(Debug)]
pub struct FileLogger {
  pub path: String,
}

#[derive(Debug)]
pub struct Mailer {
  pub logger: Instance,
  pub retries: i64,
}

#[derive(Debug)]
pub struct Report {
  pub title: String,
  pub pages: i64,
}

#[derive(Debug)]
pub struct Clock {
  pub zone: String,
}

/// `LoggerInterface` (interface), `FileLogger` implementing it, `Mailer`
/// depending on it, `Report` with two scalars, and `Clock` which is only
/// reachable through its static factory.
pub fn catalog() -> ClassCatalog {
  ClassCatalog::new()
    .with(ClassDescriptor::interface("LoggerInterface"))
    .with(
      ClassDescriptor::concrete("FileLogger")
        .implements("LoggerInterface")
        .constructor(
          vec![ParamDescriptor::scalar("path").with_default("app.log")],
          |args| {
            Ok(FileLogger {
              path: args.str("path")?.to_owned(),
            })
          },
        ),
    )
    .with(ClassDescriptor::concrete("Mailer").constructor(
      vec![
        ParamDescriptor::object("logger", "LoggerInterface"),
        ParamDescriptor::scalar("retries").with_default(1),
      ],
      |args| {
        Ok(Mailer {
          logger: args.object("logger")?.clone(),
          retries: args.int("retries")?,
        })
      },
    ))
    .with(ClassDescriptor::concrete("Report").constructor(
      vec![
        ParamDescriptor::scalar("title"),
        ParamDescriptor::scalar("pages"),
      ],
      |args| {
        Ok(Report {
          title: args.str("title")?.to_owned(),
          pages: args.int("pages")?,
        })
      },
    ))
    .with(
      ClassDescriptor::concrete("Clock")
        .non_public_constructor()
        .static_factory(
          vec![ParamDescriptor::scalar("zone").with_default("UTC")],
          |args| {
            Ok(Clock {
              zone: args.str("zone")?.to_owned(),
            })
          },
        ),
    )
}

pub fn injector() -> Injector {
  Injector::new(Arc::new(catalog()))
}

pub fn injector_with(catalog: ClassCatalog) -> Injector {
  Injector::new(Arc::new(catalog))
}
