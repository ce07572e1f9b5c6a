//! # Publisher configuration.
//!
//! Provides [`Config`] settings shared by every registry of one publisher.
//!
//! ## Sentinel values
//! - `pool_workers = 0` → size pools from the machine's available parallelism

use std::borrow::Cow;

use crate::policies::{available_workers, DispatchPolicy};

/// Settings for a [`Publisher`](crate::Publisher).
///
/// ## Field semantics
/// - `label`: name used in log records (`publisher = ...`)
/// - `log_failures`: emit a `warn` record for every failed handler
/// - `pool_workers`: worker count for `DispatchPolicy::Pool { workers: 0 }` (`0` = auto)
#[derive(Clone, Debug)]
pub struct Config {
    /// Name attached to log records of this publisher.
    pub label: Cow<'static, str>,

    /// Log each handler failure at `warn` level.
    ///
    /// Failures are always part of the [`EmitReport`](crate::EmitReport);
    /// this only controls logging.
    pub log_failures: bool,

    /// Default worker count for auto-sized pools.
    ///
    /// - `0` = available parallelism
    /// - `n > 0` = exactly `n` workers (capped by the number of handlers)
    pub pool_workers: usize,
}

impl Config {
    /// Returns a config with the given label and default settings.
    pub fn labeled(label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Returns the pool size used when a policy asks for `0` workers.
    #[inline]
    pub fn pool_workers_resolved(&self) -> usize {
        if self.pool_workers == 0 {
            available_workers()
        } else {
            self.pool_workers
        }
    }

    /// Resolves auto-sized pools in `policy` against this config.
    #[inline]
    pub fn resolve(&self, policy: DispatchPolicy) -> DispatchPolicy {
        policy.with_default_workers(self.pool_workers_resolved())
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `label = "publisher"`
    /// - `log_failures = true`
    /// - `pool_workers = 0` (available parallelism)
    fn default() -> Self {
        Self {
            label: Cow::Borrowed("publisher"),
            log_failures: true,
            pool_workers: 0,
        }
    }
}
