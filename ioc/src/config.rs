//! Injector configuration, loadable from YAML.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for an [`Injector`](crate::Injector).
///
/// ```yaml
/// max_depth: 32
/// auto_register: false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct InjectorConfig {
  /// How deep a chain of nested resolutions may grow before failing with
  /// `DepthExceeded`.
  pub max_depth: usize,
  /// Whether unregistered class names get a default definition on first
  /// resolution. When off they fail with `UnknownIdentifier`.
  pub auto_register: bool,
}

impl Default for InjectorConfig {
  fn default() -> Self {
    Self {
      max_depth: default_max_depth(),
      auto_register: true,
    }
  }
}

fn default_max_depth() -> usize {
  64
}

impl InjectorConfig {
  pub fn from_yaml_str(source: &str) -> Result<Self> {
    let config: Self = serde_yaml::from_str(source).map_err(|e| Error::ConfigParse(e.to_string()))?;
    config.validate()
  }

  pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
    let source = std::fs::read_to_string(path)?;
    Self::from_yaml_str(&source)
  }

  fn validate(self) -> Result<Self> {
    if self.max_depth == 0 {
      return Err(Error::ConfigParse("max_depth must be at least 1".to_owned()));
    }
    Ok(self)
  }
}
