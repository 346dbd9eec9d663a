//! Single choke point between transport failures and feature code.

use std::{future::Future, sync::Arc};

use shared::error::{ErrorException, SimpleError};
use thiserror::Error;
use tracing::warn;

use crate::{error::Classifier, transport::TransportError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardConfigError {
    #[error("remote call guard requires a classifier or a fallback")]
    MissingRecovery,
}

/// Wraps remote operations so that only [`ErrorException`] values reach
/// feature code.
///
/// HTTP failures go through the classifier when there is one; otherwise the
/// fallback value is returned instead. Every other failure becomes the
/// generic Simple error, whatever the guard was configured with.
pub struct RemoteCallGuard<T> {
    classify: Option<Arc<dyn Classifier>>,
    fallback: Option<Arc<dyn Fn() -> T + Send + Sync>>,
}

impl<T> Clone for RemoteCallGuard<T> {
    fn clone(&self) -> Self {
        Self {
            classify: self.classify.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

impl<T> RemoteCallGuard<T> {
    pub fn new(
        classify: Option<Arc<dyn Classifier>>,
        fallback: Option<Arc<dyn Fn() -> T + Send + Sync>>,
    ) -> Result<Self, GuardConfigError> {
        if classify.is_none() && fallback.is_none() {
            return Err(GuardConfigError::MissingRecovery);
        }
        Ok(Self { classify, fallback })
    }

    pub fn classifying(classify: Arc<dyn Classifier>) -> Self {
        Self {
            classify: Some(classify),
            fallback: None,
        }
    }

    pub fn with_fallback(fallback: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            classify: None,
            fallback: Some(Arc::new(fallback)),
        }
    }

    pub async fn run<Fut>(&self, operation: Fut) -> Result<T, ErrorException>
    where
        Fut: Future<Output = Result<T, TransportError>>,
    {
        match operation.await {
            Ok(value) => Ok(value),
            Err(TransportError::Http(failure)) => {
                if let Some(classify) = &self.classify {
                    let error = classify.classify(&failure);
                    warn!(status = failure.status, %error, "remote call: classified failure");
                    Err(error)
                } else if let Some(fallback) = &self.fallback {
                    warn!(status = failure.status, "remote call: failure recovered with fallback");
                    Ok(fallback())
                } else {
                    Err(ErrorException::Simple(SimpleError::generic().with_cause(
                        TransportError::Http(failure),
                    )))
                }
            }
            Err(other) => {
                warn!(error = %other, "remote call: unclassified failure");
                Err(ErrorException::Simple(SimpleError::generic().with_cause(other)))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/guard_tests.rs"]
mod tests;
