use std::future::Future;

use anyhow::{bail, Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A background actuation loop with cancel-then-join shutdown.
///
/// The loop receives a token and must return within one of its own cycles
/// once the token is cancelled, leaving its outputs in a defined state.
pub struct ActuationTask {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl ActuationTask {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn start<F, Fut>(&mut self, worker: F) -> Result<()>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.handle.is_some() {
            bail!("{} task already active", self.name);
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(worker(cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Signals the loop and waits for it to exit. A no-op when idle.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .with_context(|| format!("{} task failed to join", self.name))
        } else {
            Ok(())
        }
    }
}
