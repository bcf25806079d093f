//! Producers - the asynchronous functions that fetch a query's value.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type ProducerFn<T, E> = dyn Fn() -> BoxFuture<'static, Result<T, E>> + Send + Sync;

/// A shareable, zero-argument async function producing `Result<T, E>`
///
/// `Ok(value)` becomes the query's `data`, `Err(error)` its `error`. The engine
/// does not retry, transform or validate either side.
///
/// Cloning is cheap (an `Arc` bump); refetch handles keep a clone of the
/// producer they were bound with.
pub struct Producer<T, E> {
    inner: Arc<ProducerFn<T, E>>,
}

impl<T, E> Producer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Wrap an async closure
    ///
    /// ```rust
    /// use querent::Producer;
    ///
    /// let user_id = 7;
    /// let producer: Producer<String, String> =
    ///     Producer::new(move || async move { Ok(format!("user {user_id}")) });
    /// ```
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move || f().boxed()),
        }
    }

    /// Start one producer call
    pub(crate) fn call(&self) -> BoxFuture<'static, Result<T, E>> {
        (self.inner)()
    }
}

impl<T, E> Producer<T, E> {
    /// Whether both handles wrap the same closure
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T, E> Clone for Producer<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> fmt::Debug for Producer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").finish_non_exhaustive()
    }
}
