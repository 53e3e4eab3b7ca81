//! Core, non-public data structures for the injector.

use crate::error::{Error, Result};
use std::cell::RefCell;

thread_local! {
  // The frames currently being resolved on this thread, innermost last.
  // This is the key to detecting circular dependencies.
  static RESOLVING_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Slot {
  /// Resolution of a canonical identifier.
  Resolve(String),
  /// Initialization of the singleton cell for a class.
  Singleton(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
  pub(crate) injector: u64,
  pub(crate) slot: Slot,
}

/// An RAII guard to detect and prevent circular dependencies.
///
/// When created, it pushes a frame onto the thread-local resolution stack.
/// If the frame is already present we have a circular dependency and an
/// error is returned instead. When the guard is dropped, the frame is popped.
pub(crate) struct ResolutionGuard {
  frame: Frame,
}

impl ResolutionGuard {
  pub(crate) fn enter(frame: Frame, max_depth: usize) -> Result<Self> {
    RESOLVING_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      if stack.contains(&frame) {
        return Err(cycle_error(&stack, &frame));
      }
      if let Slot::Resolve(class) = &frame.slot {
        let depth = stack
          .iter()
          .filter(|f| f.injector == frame.injector && matches!(f.slot, Slot::Resolve(_)))
          .count();
        if depth >= max_depth {
          return Err(Error::DepthExceeded {
            class: class.clone(),
            limit: max_depth,
          });
        }
      }
      stack.push(frame.clone());
      Ok(())
    })?;
    Ok(Self { frame })
  }
}

impl Drop for ResolutionGuard {
  fn drop(&mut self) {
    RESOLVING_STACK.with(|stack| {
      let mut stack = stack.borrow_mut();
      if let Some(position) = stack.iter().rposition(|f| f == &self.frame) {
        stack.remove(position);
      }
    });
  }
}

fn cycle_error(stack: &[Frame], frame: &Frame) -> Error {
  let class = match &frame.slot {
    Slot::Resolve(class) | Slot::Singleton(class) => class.clone(),
  };
  let mut chain: Vec<String> = stack
    .iter()
    .skip_while(|f| *f != frame)
    .filter(|f| f.injector == frame.injector)
    .filter_map(|f| match &f.slot {
      Slot::Resolve(id) => Some(id.clone()),
      Slot::Singleton(_) => None,
    })
    .collect();
  chain.push(class.clone());
  Error::CircularDependency { class, chain }
}
