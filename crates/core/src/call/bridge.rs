//! Completion-or-future delivery of a spawned operation.
//!
//! The work always runs on its own task, so dropping the returned future
//! does not stop a write that has already been submitted.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::Error;

/// Handler invoked exactly once with the outcome of an operation.
pub type Completion<T> = Box<dyn FnOnce(Result<T, Error>) + Send + 'static>;

/// What a dispatched call hands back to its caller.
#[must_use = "a pending result does nothing unless awaited or dropped deliberately"]
pub enum Dispatch<T> {
    /// A completion handler was supplied and will receive the result.
    Handled,
    /// No handler was supplied; await this for the result.
    Pending(Pending<T>),
}

impl<T> Dispatch<T> {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatch::Handled)
    }

    /// The pending result, if the call was made without a completion.
    pub fn into_pending(self) -> Option<Pending<T>> {
        match self {
            Dispatch::Handled => None,
            Dispatch::Pending(pending) => Some(pending),
        }
    }
}

impl<T> std::fmt::Debug for Dispatch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatch::Handled => f.write_str("Handled"),
            Dispatch::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Single-resolution future for a spawned operation.
pub struct Pending<T> {
    rx: oneshot::Receiver<Result<T, Error>>,
}

impl<T> Future for Pending<T> {
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(Error::Interrupted)))
    }
}

/// Run `work` on a new task and deliver its result to `completion`, or
/// through a [`Pending`] future when there is none.
///
/// Must be called from within a tokio runtime.
pub fn dispatch<T, F>(work: F, completion: Option<Completion<T>>) -> Dispatch<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T, Error>> + Send + 'static,
{
    match completion {
        Some(done) => {
            let task = tokio::spawn(work);
            tokio::spawn(async move {
                // A panicking task still owes its handler a result.
                done(task.await.unwrap_or_else(|_| Err(Error::Interrupted)));
            });
            Dispatch::Handled
        }
        None => {
            let (tx, rx) = oneshot::channel();
            tokio::spawn(async move {
                // The caller may have dropped the Pending; the work still ran.
                let _ = tx.send(work.await);
            });
            Dispatch::Pending(Pending { rx })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_pending_resolves() {
        let pending = dispatch(async { Ok::<_, Error>(42) }, None).into_pending().unwrap();
        assert_eq!(pending.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_pending_carries_error() {
        let dispatched = dispatch(async { Err::<(), _>(Error::InvalidInput("nope".into())) }, None);
        let result = dispatched.into_pending().unwrap().await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_completion_called_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel();
        let counter = calls.clone();

        let dispatched = dispatch(
            async { Ok::<_, Error>("done") },
            Some(Box::new(move |result: Result<&'static str, Error>| {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(result.unwrap());
            })),
        );

        assert!(dispatched.is_handled());
        assert!(dispatched.into_pending().is_none());
        assert_eq!(rx.await.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_completion_sees_panicked_work() {
        let (tx, rx) = oneshot::channel();
        let work = async {
            if std::hint::black_box(true) {
                panic!("work failed");
            }
            Ok::<_, Error>(())
        };

        let dispatched = dispatch(
            work,
            Some(Box::new(move |result: Result<(), Error>| {
                let _ = tx.send(result);
            })),
        );

        assert!(dispatched.is_handled());
        assert!(matches!(rx.await.unwrap(), Err(Error::Interrupted)));
    }

    #[tokio::test]
    async fn test_work_runs_when_pending_dropped() {
        let (tx, rx) = oneshot::channel();
        let dispatched = dispatch(
            async move {
                let _ = tx.send(());
                Ok::<_, Error>(())
            },
            None,
        );
        drop(dispatched);

        assert!(rx.await.is_ok());
    }
}
