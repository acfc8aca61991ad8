//! Run stop coordination
//!
//! A run stops once, for one reason: its profile ran to the end or it was
//! interrupted. Every virtual user holds a [`StopListener`] and checks it
//! between iterations.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The profile's total duration elapsed
    Completed,
    /// Ctrl+C or an explicit [`StopHandle::stop`]
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Completed => write!(f, "completed"),
            StopReason::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Sending side of the stop signal
#[derive(Debug, Clone)]
pub struct StopHandle {
    sender: Arc<watch::Sender<Option<StopReason>>>,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopHandle {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Signal a stop. Returns false if the run was already stopping.
    pub fn stop(&self, reason: StopReason) -> bool {
        self.sender.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    pub fn reason(&self) -> Option<StopReason> {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> StopListener {
        StopListener {
            receiver: self.sender.subscribe(),
        }
    }

    /// Stop with [`StopReason::Interrupted`] on Ctrl+C
    pub fn stop_on_ctrl_c(&self) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping the run");
                handle.stop(StopReason::Interrupted);
            }
        })
    }
}

/// Receiving side of the stop signal
#[derive(Debug, Clone)]
pub struct StopListener {
    receiver: watch::Receiver<Option<StopReason>>,
}

impl StopListener {
    pub fn is_stopped(&self) -> bool {
        self.receiver.borrow().is_some()
    }

    /// Resolves once a stop was signalled
    pub async fn stopped(&mut self) {
        // A dropped sender means the run is gone, which is a stop as well
        let _ = self.receiver.wait_for(Option::is_some).await;
    }
}
