//! Provisioner error types
//!
//! One error enum for the whole core, following the taxonomy the outer
//! scheduling loop depends on: setup failures are distinct from command
//! failures, timeouts are distinct from remote-reported errors, and
//! backoff-limit-reached is a sentinel that must never be retried
//! automatically.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while provisioning installations.
#[derive(Debug, Error)]
pub enum ProvisionerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Chart deployment tool error
    #[error("helm error: {0}")]
    Helm(#[from] helm_client::HelmError),

    /// Client/handle construction or connectivity failure, as opposed to
    /// a failure of the work itself
    #[error("setup error: {0}")]
    Setup(String),

    /// A remotely executed command ran and failed
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// A bounded poll exceeded its deadline
    #[error("timed out after {after:?} waiting for {waiting_for}")]
    Timeout {
        /// The bound that expired
        after: Duration,
        /// What was being waited on
        waiting_for: String,
    },

    /// A one-shot job exhausted its backoff limit; never retried
    /// automatically - recreate under a fresh identity if retry is wanted
    #[error("job {0} exceeded its backoff limit")]
    BackoffLimitReached(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Process invocation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error wrapped with the operation and resource identity it
    /// occurred under
    #[error("{context}: {source}")]
    Context {
        /// Operation and resource identity
        context: String,
        /// The underlying failure
        #[source]
        source: Box<ProvisionerError>,
    },
}

impl ProvisionerError {
    /// Walks the context chain to the root error.
    pub fn root(&self) -> &ProvisionerError {
        match self {
            ProvisionerError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when this error (or its root) is the backoff-limit sentinel.
    pub fn is_backoff_limit_reached(&self) -> bool {
        matches!(self.root(), ProvisionerError::BackoffLimitReached(_))
    }

    /// True when this error (or its root) is a poll timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self.root(), ProvisionerError::Timeout { .. })
    }
}

/// Attaches operation/resource context to provisioner results.
pub trait ErrorContext<T> {
    /// Wraps the error with `context`, evaluated lazily.
    fn with_context<F>(self, context: F) -> Result<T, ProvisionerError>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: Into<ProvisionerError>,
{
    fn with_context<F>(self, context: F) -> Result<T, ProvisionerError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ProvisionerError::Context {
            context: context(),
            source: Box::new(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_preserves_root_classification() {
        let err: Result<(), ProvisionerError> =
            Err(ProvisionerError::BackoffLimitReached("job1".to_string()));
        let wrapped = err
            .with_context(|| "checking backup job ns1/job1".to_string())
            .unwrap_err();

        assert!(wrapped.is_backoff_limit_reached());
        assert!(!wrapped.is_timeout());
        let rendered = wrapped.to_string();
        assert!(rendered.contains("checking backup job ns1/job1"));
    }

    #[test]
    fn timeout_renders_what_was_waited_on() {
        let err = ProvisionerError::Timeout {
            after: Duration::from_secs(600),
            waiting_for: "job ns1/exec to complete".to_string(),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("job ns1/exec to complete"));
    }
}
