use fibre_di::{make, ClassCatalog, ClassDescriptor, Definition, Injector};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

// A simple service that gets a unique ID upon creation.
struct RequestTracker {
  id: usize,
}

// A global, thread-safe counter to generate unique IDs.
static ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn main() {
  let catalog = ClassCatalog::new().with(ClassDescriptor::concrete("RequestTracker").constructor(
    Vec::new(),
    |_| {
      println!("Constructing RequestTracker...");
      Ok(RequestTracker {
        id: ID_COUNTER.fetch_add(1, Ordering::SeqCst),
      })
    },
  ));
  let injector = Injector::new(Arc::new(catalog));

  // The class itself stays transient; the synonym-backed identifier below
  // shares one instance.
  injector
    .add(
      "shared_tracker",
      Definition::of("RequestTracker").singleton().synonym("tracker"),
    )
    .unwrap();

  println!("--- Resolving Singletons ---");
  let s1 = make!(injector, RequestTracker, "shared_tracker");
  let s2 = make!(injector, RequestTracker, "tracker");
  println!("Singleton 1 ID: {}, Singleton 2 ID: {}", s1.id, s2.id);
  assert_eq!(s1.id, 0);
  assert!(
    Arc::ptr_eq(&s1, &s2),
    "Singleton instances should be identical"
  );
  println!("Singleton instances are the same pointer, as expected.\n");

  // Replacing the definition drops the cached instance.
  injector
    .add(
      "shared_tracker",
      Definition::of("RequestTracker").singleton().replace(true),
    )
    .unwrap();
  let s3 = make!(injector, RequestTracker, "shared_tracker");
  println!("After replacement, singleton ID: {}\n", s3.id);
  assert_eq!(s3.id, 1);

  println!("--- Resolving Transients ---");
  let t1 = make!(injector, RequestTracker, "RequestTracker");
  let t2 = make!(injector, RequestTracker, "RequestTracker");
  println!("Transient 1 ID: {}, Transient 2 ID: {}", t1.id, t2.id);
  assert!(
    !Arc::ptr_eq(&t1, &t2),
    "Transient instances should be different"
  );
  println!("Transient instances are different pointers, as expected.");
}
