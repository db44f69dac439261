use std::sync::{Arc, OnceLock};

use futures::future::{BoxFuture, FutureExt, Shared};

use crate::error::{AppError, Result};

type Producer<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;
type Outcome<T> = std::result::Result<Arc<T>, Arc<AppError>>;

/// A value fetched on first access and cached afterwards.
///
/// The producer runs at most once. The running fetch itself is stored, so
/// readers that arrive while it is in flight wait on it, and a reader that
/// gives up early does not cause a second fetch. A failure is cached just
/// like a success.
pub struct Lazy<T> {
    outcome: OnceLock<Outcome<T>>,
    fetch: OnceLock<Shared<BoxFuture<'static, Outcome<T>>>>,
    producer: Option<Producer<T>>,
}

impl<T: Send + Sync + 'static> Lazy<T> {
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<T>> + Send + Sync + 'static,
    {
        Self {
            outcome: OnceLock::new(),
            fetch: OnceLock::new(),
            producer: Some(Box::new(producer)),
        }
    }

    /// A lazy value that is already resolved and never fetches.
    pub fn resolved(value: T) -> Self {
        Self {
            outcome: OnceLock::from(Ok(Arc::new(value))),
            fetch: OnceLock::new(),
            producer: None,
        }
    }

    pub async fn get(&self) -> Result<&T> {
        let outcome = match self.outcome.get() {
            Some(outcome) => outcome,
            None => {
                let fetch = self.fetch.get_or_init(|| self.start()).clone();
                let result = fetch.await;
                self.outcome.get_or_init(|| result)
            }
        };

        match outcome {
            Ok(value) => Ok(value.as_ref()),
            Err(e) => Err(AppError::Shared(Arc::clone(e))),
        }
    }

    /// Whether the value (or its failure) has been produced.
    pub fn is_resolved(&self) -> bool {
        self.outcome.get().is_some()
    }

    fn start(&self) -> Shared<BoxFuture<'static, Outcome<T>>> {
        let fetch: BoxFuture<'static, Outcome<T>> = match &self.producer {
            Some(produce) => produce()
                .map(|result| result.map(Arc::new).map_err(Arc::new))
                .boxed(),
            None => futures::future::ready(Err(Arc::new(AppError::Internal(
                "lazy value has no producer".to_string(),
            ))))
            .boxed(),
        };
        fetch.shared()
    }
}
