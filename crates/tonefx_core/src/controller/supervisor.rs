//! Background task ownership and startup state

use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};

/// Startup state machine of a stateful controller
///
/// `Uninitialized -> Hydrated` once the stored configuration has been loaded
/// and applied to the engine. `Failed` and `Stopped` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupState {
    Uninitialized,
    Hydrated,
    Failed(String),
    Stopped,
}

/// Publishes a controller's startup state and lets callers wait on it
#[derive(Debug)]
pub(crate) struct Startup {
    sender: watch::Sender<StartupState>,
}

impl Startup {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(StartupState::Uninitialized);
        Self { sender }
    }

    pub fn state(&self) -> StartupState {
        self.sender.borrow().clone()
    }

    pub fn set(&self, state: StartupState) {
        self.sender.send_replace(state);
    }

    /// Move to `Stopped` unless already in a terminal failure state
    pub fn stop(&self) {
        self.sender.send_if_modified(|state| match state {
            StartupState::Failed(_) | StartupState::Stopped => false,
            _ => {
                *state = StartupState::Stopped;
                true
            }
        });
    }

    /// Wait until hydration finished; error if it failed or the controller stopped
    pub async fn wait_ready(&self) -> CoreResult<()> {
        let mut rx = self.sender.subscribe();
        let state = rx
            .wait_for(|state| *state != StartupState::Uninitialized)
            .await
            .map_err(|_| CoreError::NotReady("controller dropped".into()))?
            .clone();

        match state {
            StartupState::Hydrated => Ok(()),
            StartupState::Failed(message) => Err(CoreError::NotReady(message)),
            StartupState::Stopped => Err(CoreError::NotReady("controller shut down".into())),
            StartupState::Uninitialized => Err(CoreError::NotReady("not hydrated".into())),
        }
    }
}

/// Owns a controller's background task and aborts it on shutdown or drop
pub(crate) struct Supervisor {
    name: &'static str,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    /// Spawn `task` on the current tokio runtime
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn spawn<F>(name: &'static str, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!("Spawning {} background task", name);
        Self {
            name,
            handle: Mutex::new(Some(tokio::spawn(task))),
        }
    }

    pub fn shutdown(&self) {
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
            info!("{} background task stopped", self.name);
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}
