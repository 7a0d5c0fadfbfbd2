use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::{self, Receiver, Sender};

/// Broadcasts a one-shot shutdown signal to every [DelegatedShutdownListener] created from it.
///
/// The signal is sticky: listeners created after [ShutdownHandle::shutdown] has been called see
/// the run as shut down straight away.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: broadcast::channel(1).0,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn shutdown(&self) {
        if self.triggered.swap(true, Ordering::SeqCst) {
            log::trace!("Shutdown already requested");
            return;
        }

        if let Err(e) = self.sender.send(()) {
            // Nobody is listening yet, the flag is enough for listeners created later.
            log::debug!("No active shutdown listeners: {e:?}");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener {
            receiver: self.sender.subscribe(),
            triggered: self.triggered.clone(),
        }
    }
}

#[derive(Debug)]
pub struct DelegatedShutdownListener {
    receiver: Receiver<()>,
    triggered: Arc<AtomicBool>,
}

impl Clone for DelegatedShutdownListener {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.resubscribe(),
            triggered: self.triggered.clone(),
        }
    }
}

impl DelegatedShutdownListener {
    /// Point in time check if the shutdown signal has been sent. If this returns true then no new
    /// work should be started.
    pub fn should_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Wait for the shutdown signal. It is safe to race this with another future so that the
    /// shutdown signal cancels the other work in progress.
    pub async fn wait_for_shutdown(&mut self) {
        if self.should_shutdown() {
            return;
        }

        // A closed or lagged channel also means the handle is gone or has fired.
        let _ = self.receiver.recv().await;
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ShutdownSignalError {
    msg: String,
}

impl Default for ShutdownSignalError {
    fn default() -> Self {
        Self {
            msg: "Execution cancelled by shutdown signal".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn listener_sees_shutdown_sent_before_it_was_created() {
        let handle = ShutdownHandle::new();
        handle.shutdown();

        let listener = handle.new_listener();
        assert!(listener.should_shutdown());
        assert!(handle.is_shutdown());
    }

    #[tokio::test]
    async fn wait_for_shutdown_returns_once_signalled() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();
        assert!(!listener.should_shutdown());

        let signaller = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            signaller.shutdown();
        });

        tokio::time::timeout(Duration::from_secs(5), listener.wait_for_shutdown())
            .await
            .expect("Listener did not observe shutdown");
    }

    #[tokio::test]
    async fn cloned_listener_observes_shutdown() {
        let handle = ShutdownHandle::new();
        let listener = handle.new_listener();
        let mut cloned = listener.clone();

        handle.shutdown();
        handle.shutdown();

        tokio::time::timeout(Duration::from_secs(5), cloned.wait_for_shutdown())
            .await
            .expect("Cloned listener did not observe shutdown");
    }
}
