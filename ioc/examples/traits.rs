use fibre_di::{deps, make, ClassCatalog, ClassDescriptor, Definition, Injector, ParamDescriptor};
use std::sync::Arc;

// 1. Define the abstraction (the trait)
trait Logger: Send + Sync {
  fn log(&self, message: &str);
}

// 2. Define a concrete implementation
struct ConsoleLogger {
  prefix: String,
}

impl Logger for ConsoleLogger {
  fn log(&self, message: &str) {
    println!("[{}]: {}", self.prefix, message);
  }
}

// 3. Define a service that depends on the abstraction
struct ReportService {
  logger: Arc<Arc<dyn Logger>>,
  title: String,
}

impl ReportService {
  fn generate_report(&self) {
    self.logger.log(&format!("Starting report '{}'.", self.title));
    self.logger.log("Finished report generation.");
  }
}

fn main() {
  // Describe the classes. Implementations of `Logger` are stored as trait
  // objects so any of them can satisfy a `Logger` parameter.
  let catalog = ClassCatalog::new()
    .with(ClassDescriptor::interface("Logger"))
    .with(
      ClassDescriptor::concrete("ConsoleLogger")
        .implements("Logger")
        .constructor(
          vec![ParamDescriptor::scalar("prefix").with_default("CONSOLE LOG")],
          |args| {
            let logger: Arc<dyn Logger> = Arc::new(ConsoleLogger {
              prefix: args.str("prefix")?.to_owned(),
            });
            Ok(logger)
          },
        ),
    )
    .with(ClassDescriptor::concrete("ReportService").constructor(
      vec![
        ParamDescriptor::object("logger", "Logger"),
        ParamDescriptor::scalar("title"),
      ],
      |args| {
        Ok(ReportService {
          logger: args.instance::<Arc<dyn Logger>>("logger")?,
          title: args.str("title")?.to_owned(),
        })
      },
    ));
  let injector = Injector::new(Arc::new(catalog));

  // Bind the interface to a concrete class.
  injector
    .add(
      "Logger",
      Definition::of("ConsoleLogger")
        .singleton()
        .dependencies(deps! { prefix => "REPORTS" }),
    )
    .unwrap();

  let service = make!(injector, ReportService, "ReportService", &deps! { title => "Q3" });
  service.generate_report();

  // Unbound interfaces fail loudly instead of guessing an implementation.
  injector.remove("Logger");
  match injector.make("ReportService") {
    Ok(_) => unreachable!("the Logger binding was removed"),
    Err(error) => println!("Expected failure: {error}"),
  }
}
