//! Tests for callables, methods, cycle detection, concurrency and
//! configuration.

mod common;

use fibre_di::{
  deps, Callable, ClassCatalog, ClassDescriptor, Definition, Error, Injector, InjectorConfig,
  ParamDescriptor, Resolved, Value,
};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

// --- Advanced Test Fixtures ---

struct Journal {
  path: String,
}

struct Node;

fn journal_catalog() -> ClassCatalog {
  common::catalog().with(
    ClassDescriptor::concrete("Journal")
      .constructor(
        vec![ParamDescriptor::scalar("path").with_default("app.log")],
        |args| {
          Ok(Journal {
            path: args.str("path")?.to_owned(),
          })
        },
      )
      .static_method("version", Vec::new(), |_| Ok(Value::from("1.0")))
      .method::<Journal, _>(
        "write",
        vec![ParamDescriptor::scalar("message")],
        |journal, args| Ok(Value::from(format!("{}: {}", journal.path, args.str("message")?))),
      ),
  )
}

/// A chain of classes where each takes the next as its only parameter.
fn chain_catalog(links: &[(&str, Option<&str>)]) -> ClassCatalog {
  links.iter().fold(ClassCatalog::new(), |catalog, (class, next)| {
    let params = match next {
      Some(next) => vec![ParamDescriptor::object("next", *next)],
      None => Vec::new(),
    };
    catalog.with(ClassDescriptor::concrete(*class).constructor(params, |_| Ok(Node)))
  })
}

fn sum() -> Callable {
  Callable::new(
    "sum",
    vec![ParamDescriptor::scalar("a"), ParamDescriptor::scalar("b")],
    |args| Ok(Value::from(args.int("a")? + args.int("b")?)),
  )
}

// --- Callables and methods ---

#[test]
fn test_function_target_is_deferred_and_rerunnable() {
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&calls);
  let callable = Callable::new(
    "count",
    vec![ParamDescriptor::scalar("step")],
    move |args| {
      let step = args.int("step")? as usize;
      Ok(Value::from(counter.fetch_add(step, Ordering::SeqCst) as i64 + step as i64))
    },
  );
  let injector = common::injector();

  let thunk = injector
    .resolve(callable, &deps! { step => 2 })
    .unwrap()
    .into_thunk()
    .unwrap();

  // Nothing runs until the thunk is invoked.
  assert_eq!(calls.load(Ordering::SeqCst), 0);
  assert_eq!(thunk.label(), "count");
  assert_eq!(thunk.invoke().unwrap(), Value::Int(2));
  assert_eq!(thunk.invoke().unwrap(), Value::Int(4));
}

#[test]
fn test_call_runs_immediately_with_bound_arguments() {
  let injector = common::injector();

  let value = injector.call(&sum(), &deps! { [0] => 2, b => 40 }).unwrap();

  assert_eq!(value, Value::Int(42));
}

#[test]
fn test_static_method_is_called_immediately() {
  let injector = common::injector_with(journal_catalog());

  let resolved = injector.resolve(("Journal", "version"), &deps! {}).unwrap();

  match resolved {
    Resolved::Value(value) => assert_eq!(value.as_str(), Some("1.0")),
    other => panic!("expected an immediate value, got {other:?}"),
  }
}

#[test]
fn test_instance_method_resolves_receiver_and_defers() {
  let injector = common::injector_with(journal_catalog());
  injector
    .add(
      "Journal",
      Definition::new().dependencies(deps! { path => "audit.log" }),
    )
    .unwrap();

  let resolved = injector
    .resolve(("Journal", "write"), &deps! { message => "hello" })
    .unwrap();
  let thunk = resolved.into_thunk().unwrap();

  assert_eq!(thunk.label(), "Journal::write");
  assert_eq!(thunk.invoke().unwrap().as_str(), Some("audit.log: hello"));
}

#[test]
fn test_unknown_method_is_an_error() {
  let injector = common::injector_with(journal_catalog());

  let error = injector
    .call_method("Journal", "erase", &deps! {})
    .unwrap_err();

  assert!(matches!(
    error,
    Error::UnknownMethod { ref class, ref method } if class == "Journal" && method == "erase"
  ));
}

#[test]
fn test_missing_method_argument_names_the_method() {
  let injector = common::injector_with(journal_catalog());

  let error = injector
    .call_method("Journal", "write", &deps! {})
    .unwrap_err();

  assert!(matches!(
    error,
    Error::MissingArgument { ref parameter, ref owner }
      if parameter == "message" && owner.as_deref() == Some("Journal::write")
  ));
}

#[test]
fn test_bind_function_args_without_calling() {
  let injector = common::injector();

  let args = injector
    .bind_function_args(&sum(), &deps! { [0] => 1, [1] => 2 })
    .unwrap();
  let error = injector
    .bind_function_args(&sum(), &deps! { b => 2 })
    .unwrap_err();

  assert_eq!(args.names().collect::<Vec<_>>(), vec!["a", "b"]);
  assert_eq!(args.at(1), Some(&Value::Int(2)));
  assert!(matches!(
    error,
    Error::MissingArgument { ref parameter, ref owner }
      if parameter == "a" && owner.as_deref() == Some("sum")
  ));
}

#[test]
fn test_bind_method_args_without_calling() {
  let injector = common::injector_with(journal_catalog());

  let args = injector
    .bind_method_args("Journal", "write", &deps! { message => "hi" })
    .unwrap();

  assert_eq!(args.len(), 1);
  assert_eq!(args.str("message").unwrap(), "hi");
}

// --- Cycles and depth ---

#[test]
fn test_circular_dependency_reports_chain() {
  let injector = common::injector_with(chain_catalog(&[("A", Some("B")), ("B", Some("A"))]));

  let error = injector.make("A").unwrap_err();

  match error {
    Error::CircularDependency { class, chain } => {
      assert_eq!(class, "A");
      assert_eq!(chain, vec!["A", "B", "A"]);
    }
    other => panic!("unexpected error: {other}"),
  }
  // The injector stays usable after the failure.
  assert!(matches!(
    injector.make("B"),
    Err(Error::CircularDependency { .. })
  ));
}

#[test]
fn test_circular_singletons_fail_instead_of_deadlocking() {
  let injector = common::injector_with(chain_catalog(&[("A", Some("B")), ("B", Some("A"))]));
  injector
    .add_list(vec![
      ("A", Definition::new().singleton()),
      ("B", Definition::new().singleton()),
    ])
    .unwrap();

  let error = injector.make("A").unwrap_err();

  assert!(matches!(error, Error::CircularDependency { ref chain, .. } if chain == &["A", "B", "A"]));
  assert!(injector.singletons().is_empty());
}

#[test]
fn test_circular_singletons_across_threads_fail_instead_of_deadlocking() {
  // Each singleton first builds a slow transient so both threads hold their
  // own cell before reaching for the other's.
  let catalog = ClassCatalog::new()
    .with(ClassDescriptor::concrete("Slow").constructor(Vec::new(), |_| {
      thread::sleep(Duration::from_millis(200));
      Ok(Node)
    }))
    .with(ClassDescriptor::concrete("A").constructor(
      vec![
        ParamDescriptor::object("slow", "Slow"),
        ParamDescriptor::object("next", "B"),
      ],
      |_| Ok(Node),
    ))
    .with(ClassDescriptor::concrete("B").constructor(
      vec![
        ParamDescriptor::object("slow", "Slow"),
        ParamDescriptor::object("next", "A"),
      ],
      |_| Ok(Node),
    ));
  let injector = Arc::new(common::injector_with(catalog));
  injector
    .add_list(vec![
      ("A", Definition::new().singleton()),
      ("B", Definition::new().singleton()),
    ])
    .unwrap();

  // Detached threads and a timeout keep a regression from hanging the run.
  let (tx, rx) = mpsc::channel();
  for class in ["A", "B"] {
    let injector = Arc::clone(&injector);
    let tx = tx.clone();
    thread::spawn(move || {
      let _ = tx.send((class, injector.make(class)));
    });
  }

  for _ in 0..2 {
    let (class, result) = rx
      .recv_timeout(Duration::from_secs(5))
      .expect("singleton cycle across threads deadlocked");
    assert!(
      matches!(result, Err(Error::CircularDependency { .. })),
      "resolving {class} returned {result:?}"
    );
  }
  assert!(injector.singletons().is_empty());
}

#[test]
fn test_depth_limit_is_enforced() {
  let catalog = chain_catalog(&[("Top", Some("Middle")), ("Middle", Some("Leaf")), ("Leaf", None)]);
  let shallow = Injector::with_config(
    Arc::new(catalog),
    InjectorConfig {
      max_depth: 2,
      ..InjectorConfig::default()
    },
  );

  let error = shallow.make("Top").unwrap_err();

  assert!(matches!(
    error,
    Error::DepthExceeded { ref class, limit: 2 } if class == "Leaf"
  ));
  assert!(shallow.make("Middle").is_ok());
}

// --- Concurrency ---

#[test]
fn test_singleton_constructed_once_under_concurrency() {
  let calls = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&calls);
  let catalog = ClassCatalog::new().with(ClassDescriptor::concrete("Pool").constructor(
    Vec::new(),
    move |_| {
      counter.fetch_add(1, Ordering::SeqCst);
      // Widen the window for racing initializers.
      thread::sleep(Duration::from_millis(50));
      Ok(Node)
    },
  ));
  let injector = common::injector_with(catalog);
  injector.add("Pool", Definition::new().singleton()).unwrap();

  let instances: Vec<_> = thread::scope(|s| {
    let handles: Vec<_> = (0..20).map(|_| s.spawn(|| injector.make("Pool").unwrap())).collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  assert_eq!(calls.load(Ordering::SeqCst), 1);
  assert!(instances.iter().all(|instance| instance.ptr_eq(&instances[0])));
}

#[test]
fn test_failed_singleton_construction_can_be_retried() {
  let attempts = Arc::new(AtomicUsize::new(0));
  let counter = Arc::clone(&attempts);
  let catalog = ClassCatalog::new().with(ClassDescriptor::concrete("Flaky").constructor(
    Vec::new(),
    move |_| {
      if counter.fetch_add(1, Ordering::SeqCst) == 0 {
        return Err(Error::construction("backend not ready"));
      }
      Ok(Node)
    },
  ));
  let injector = common::injector_with(catalog);
  injector.add("Flaky", Definition::new().singleton()).unwrap();

  let first = injector.make("Flaky");
  let second = injector.make("Flaky").unwrap();
  let third = injector.make("Flaky").unwrap();

  assert!(matches!(first, Err(Error::Construction(ref message)) if message == "backend not ready"));
  assert!(second.ptr_eq(&third));
  assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_concurrent_registration_and_resolution() {
  let injector = common::injector();
  injector
    .add("LoggerInterface", Definition::of("FileLogger").singleton())
    .unwrap();

  thread::scope(|s| {
    for i in 0..10 {
      let injector = &injector;
      s.spawn(move || {
        injector
          .add(
            &format!("logger_{i}"),
            Definition::of("FileLogger").dependencies(deps! { path => format!("{i}.log") }),
          )
          .unwrap();
        for _ in 0..50 {
          let mailer = injector.make_as::<common::Mailer>("Mailer", &deps! {}).unwrap();
          assert_eq!(mailer.logger.class(), "FileLogger");
        }
        let mine = injector
          .make_as::<common::FileLogger>(&format!("logger_{i}"), &deps! {})
          .unwrap();
        assert_eq!(mine.path, format!("{i}.log"));
      });
    }
  });

  let fifth = injector
    .make_as::<common::FileLogger>("logger_5", &deps! {})
    .unwrap();
  assert_eq!(fifth.path, "5.log");
  // Ten named loggers, the interface binding, and the synthesized Mailer.
  assert_eq!(injector.container().len(), 12);
}

// --- Configuration ---

#[test]
fn test_config_from_yaml_str_fills_defaults() {
  let config = InjectorConfig::from_yaml_str("max_depth: 8\n").unwrap();

  assert_eq!(
    config,
    InjectorConfig {
      max_depth: 8,
      auto_register: true,
    }
  );
}

#[test]
fn test_config_rejects_unknown_fields_and_zero_depth() {
  let unknown = InjectorConfig::from_yaml_str("max_depth: 8\nlazy: true\n");
  let zero = InjectorConfig::from_yaml_str("max_depth: 0\n");

  assert!(matches!(unknown, Err(Error::ConfigParse(_))));
  assert!(matches!(zero, Err(Error::ConfigParse(ref message)) if message.contains("max_depth")));
}

#[test]
fn test_config_from_yaml_file() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  writeln!(file, "max_depth: 16").unwrap();
  writeln!(file, "auto_register: false").unwrap();

  let config = InjectorConfig::from_yaml_file(file.path()).unwrap();
  let missing = InjectorConfig::from_yaml_file(file.path().with_extension("missing"));

  assert_eq!(config.max_depth, 16);
  assert!(!config.auto_register);
  assert!(matches!(missing, Err(Error::ConfigRead(_))));
}
