//! Ordered fallback over unreliable data sources.
//!
//! A [`FallbackChain`] is a list of named [`Strategy`] values tried strictly
//! in order, each under its own timeout. The first success wins. When all of
//! them fail, the caller's static default is used. Sources are never raced.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

/// Outcome of one strategy attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    /// The source produced usable data.
    Success(T),
    /// The source is not configured. Not a failure.
    Skipped,
    /// The source was tried and failed.
    Failed(anyhow::Error),
}

/// One source in a fallback chain.
#[async_trait]
pub trait Strategy<T>: Send + Sync {
    /// Name used in logs and in [`Resolved::source`].
    fn name(&self) -> &'static str;

    /// Try the source once.
    async fn attempt(&self) -> Attempt<T>;
}

/// Which source produced a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Strategy(&'static str),
    StaticDefault,
}

/// A value together with the source that produced it.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: Source,
}

/// Ordered list of strategies, each bounded by `timeout`.
pub struct FallbackChain<T> {
    strategies: Vec<Box<dyn Strategy<T>>>,
    timeout: Duration,
}

impl<T: Send> FallbackChain<T> {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            strategies: Vec::new(),
            timeout,
        }
    }

    /// Append a strategy. Strategies run in the order they are added.
    #[must_use]
    pub fn with(mut self, strategy: Box<dyn Strategy<T>>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Names of the registered strategies, in order.
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Try each strategy in turn, returning the first success.
    ///
    /// A strategy that exceeds the timeout is dropped mid-flight, which
    /// cancels its request.
    pub async fn resolve_or(&self, default: impl FnOnce() -> T) -> Resolved<T> {
        for strategy in &self.strategies {
            let name = strategy.name();
            match tokio::time::timeout(self.timeout, strategy.attempt()).await {
                Ok(Attempt::Success(value)) => {
                    debug!(source = name, "Fallback chain resolved");
                    return Resolved {
                        value,
                        source: Source::Strategy(name),
                    };
                }
                Ok(Attempt::Skipped) => {
                    debug!(source = name, "Source not configured, skipping");
                }
                Ok(Attempt::Failed(e)) => {
                    warn!(source = name, "Source failed: {e:#}");
                }
                Err(_) => {
                    warn!(
                        source = name,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Source timed out"
                    );
                }
            }
        }

        debug!("All sources failed, using static default");
        Resolved {
            value: default(),
            source: Source::StaticDefault,
        }
    }
}
