//! Session Outcome
//!
//! A one-shot result whose resolve/reject side lives apart from the future the
//! caller awaits.

use tokio::sync::oneshot;

use crate::error::SheetError;
use crate::record::CollectedData;

/// What one `open` cycle settles to
pub type Outcome = Result<CollectedData, SheetError>;

/// Settling side of an outcome
///
/// Settles at most once; later calls are ignored and report `false`.
#[derive(Debug)]
pub struct Deferred<T> {
    tx: Option<oneshot::Sender<T>>,
}

impl<T> Deferred<T> {
    /// Create the settling side and the receiver the caller awaits
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A deferred that is already spent
    pub fn settled() -> Self {
        Self { tx: None }
    }

    pub fn is_settled(&self) -> bool {
        self.tx.is_none()
    }

    fn settle(&mut self, value: T) -> bool {
        match self.tx.take() {
            // A dropped receiver still counts as settled
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::settled()
    }
}

impl<V> Deferred<Result<V, SheetError>> {
    pub fn resolve(&mut self, value: V) -> bool {
        self.settle(Ok(value))
    }

    pub fn reject(&mut self, err: SheetError) -> bool {
        self.settle(Err(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_single_resolution() {
        let (mut deferred, rx) = Deferred::<Outcome>::new();
        assert!(deferred.resolve(CollectedData::new()));
        assert!(!deferred.reject(SheetError::Aborted("late".into())));
        assert!(deferred.is_settled());

        assert!(rx.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_reject_carries_reason() {
        let (mut deferred, rx) = Deferred::<Outcome>::new();
        deferred.reject(SheetError::Aborted("User aborted.".into()));

        let err = rx.await.unwrap().unwrap_err();
        assert_eq!(err.abort_reason(), Some("User aborted."));
    }

    #[test]
    fn test_settle_after_receiver_dropped() {
        let (mut deferred, rx) = Deferred::<Outcome>::new();
        drop(rx);
        assert!(deferred.resolve(CollectedData::new()));
    }
}
