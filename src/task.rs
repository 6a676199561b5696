use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// A spawned background task paired with the token that stops it.
///
/// Dropping the handle cancels the task.
#[derive(Debug)]
pub struct Stoppable {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}
impl Stoppable {
    pub fn start<F, Fut>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(f(cancel.clone()));
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    pub async fn join(mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if let Err(e) = handle.await {
            if e.is_panic() {
                error!(error = %e, "background task panicked");
            }
        }
    }
    pub async fn stop(self) {
        self.cancel();
        self.join().await;
    }
}
impl Drop for Stoppable {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel.cancel();
        }
    }
}
