use thiserror::Error;

/// The main error type for the `fibre_di` library.
#[derive(Debug, Error)]
pub enum Error {
  #[error("Parameter '{parameter}' is required{}", in_owner(.owner))]
  MissingArgument {
    parameter: String,
    owner: Option<String>,
  },

  #[error("Invalid definition: {0}")]
  InvalidDefinition(String),

  #[error("Unknown identifier '{0}': not registered and not a known class")]
  UnknownIdentifier(String),

  #[error("Unknown method '{method}' on class '{class}'")]
  UnknownMethod { class: String, method: String },

  #[error("Cannot resolve abstract type '{class}': no concrete binding registered")]
  UnresolvableAbstractType { class: String },

  #[error("Class '{class}' has no public constructor and no static factory")]
  NotInstantiable { class: String },

  #[error("'{target}' did not produce the requested instance (got {found})")]
  NotAnInstance { target: String, found: String },

  #[error("Argument '{parameter}' has the wrong kind: expected {expected}, found {found}")]
  ArgumentType {
    parameter: String,
    expected: &'static str,
    found: String,
  },

  #[error("Invalid call: {0}")]
  InvalidCall(String),

  #[error("Circular dependency detected while resolving '{class}': {}", .chain.join(" -> "))]
  CircularDependency { class: String, chain: Vec<String> },

  #[error("Resolution depth limit of {limit} exceeded while resolving '{class}'")]
  DepthExceeded { class: String, limit: usize },

  #[error("Construction failed: {0}")]
  Construction(String),

  #[error("Failed to read configuration file: {0}")]
  ConfigRead(#[from] std::io::Error),

  #[error("Failed to parse configuration: {0}")]
  ConfigParse(String),
}

impl Error {
  /// Wraps a failure raised inside a user-supplied constructor or callable.
  pub fn construction(message: impl std::fmt::Display) -> Self {
    Error::Construction(message.to_string())
  }
}

fn in_owner(owner: &Option<String>) -> String {
  match owner {
    Some(owner) => format!(" in {owner}"),
    None => String::new(),
  }
}

/// A specialized `Result` type for `fibre_di` operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
