//! Share Configuration - debug tracing and worker thread settings
//!
//! A `ShareConfig` is passed explicitly to the hub store, the registry and,
//! through each worker's context, to every replica. There is no
//! process-wide debug switch.
//!
//! Configurations can be written in RON:
//!
//! ```ron
//! (
//!     debug: true,
//!     thread_name: "pricing-worker",
//!     stack_size: Some(1048576),
//! )
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration shared by the hub and its workers
///
/// # Example
///
/// ```
/// use workshare_core::ShareConfig;
///
/// let config = ShareConfig::default();
/// assert!(!config.debug());
///
/// let config = ShareConfig::from_ron("(debug: true)").unwrap();
/// assert!(config.debug());
/// assert_eq!(config.thread_name(), "workshare-worker");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Log every protocol message and lifecycle event at `debug` level
    debug: bool,
    /// Prefix for worker thread names; the worker id is appended
    thread_name: String,
    /// Stack size for worker threads (platform default when `None`)
    stack_size: Option<usize>,
}

impl ShareConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from RON text
    ///
    /// Missing fields take their default values.
    pub fn from_ron(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Load a configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Whether protocol traffic is traced
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Worker thread name prefix
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Worker thread stack size
    pub fn stack_size(&self) -> Option<usize> {
        self.stack_size
    }

    /// Enable or disable protocol tracing
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the worker thread name prefix
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the worker thread stack size
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            debug: false,
            thread_name: "workshare-worker".to_string(),
            stack_size: None,
        }
    }
}
