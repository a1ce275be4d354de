//! Client state containers.
//!
//! Each store is an independent observable cell: renderers take
//! snapshots with `get()` or follow changes through `subscribe()`.
//! Stores that survive restarts write through to `KeyValueStorage`.

pub mod auth;
pub mod diagnosis;
pub mod health;
pub mod history;
pub mod settings;

pub use auth::{AuthSession, AuthStore};
pub use diagnosis::{DiagnosisState, DiagnosisStore, SubmissionRejected};
pub use health::{HealthMonitor, HealthPolicy, HealthStore};
pub use history::{HistoryStore, HISTORY_CAPACITY};
pub use settings::SettingsStore;

use tokio::sync::watch;

/// Observable mutable cell.
pub struct Store<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Store<T> {
    pub fn new(value: T) -> Self {
        let (tx, _rx) = watch::channel(value);
        Self { tx }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Read without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Mutate in place and notify subscribers.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut out = None;
        self.tx.send_modify(|value| out = Some(f(value)));
        match out {
            Some(out) => out,
            None => unreachable!("send_modify always runs the closure"),
        }
    }

    /// Mutate, notifying subscribers only when `f` reports a change.
    pub fn update_if(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone + Default> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
