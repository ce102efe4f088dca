//! Catalog refresh signalling
//!
//! Uploads and batch operations never touch the catalog's cached page. They bump a generation
//! counter instead, and the catalog refetches when it sees the counter moved. Any number of
//! signals between two refreshes collapse into one.

use std::sync::Arc;

use tokio::sync::watch;

/// Sender half, held by the upload queue, batch coordinator and version chain
#[derive(Debug, Clone)]
pub struct RefreshSignal {
    tx: Arc<watch::Sender<u64>>,
}

/// Receiver half, owned by the catalog
#[derive(Debug, Clone)]
pub struct RefreshListener {
    rx: watch::Receiver<u64>,
    /// Last generation the catalog handled
    seen: u64,
}

pub fn refresh_channel() -> (RefreshSignal, RefreshListener) {
    let (tx, rx) = watch::channel(0u64);
    (RefreshSignal { tx: Arc::new(tx) }, RefreshListener { rx, seen: 0 })
}

impl RefreshSignal {
    /// Request one catalog refresh.
    pub fn signal(&self) {
        self.tx.send_modify(|generation| *generation += 1);
    }

    /// Number of signals sent so far
    pub fn generation(&self) -> u64 {
        *self.tx.borrow()
    }
}

impl RefreshListener {
    /// True when a signal arrived since the last acknowledgement.
    pub fn is_pending(&self) -> bool {
        *self.rx.borrow() != self.seen
    }

    /// Latest generation, without acknowledging it
    pub fn current(&self) -> u64 {
        *self.rx.borrow()
    }

    /// Mark signals up to `generation` as handled. Later signals stay pending.
    pub fn acknowledge_up_to(&mut self, generation: u64) {
        self.seen = self.seen.max(generation);
    }

    /// Mark every signal so far as handled. Returns the generation seen.
    pub fn acknowledge(&mut self) -> u64 {
        let generation = *self.rx.borrow_and_update();
        self.acknowledge_up_to(generation);
        generation
    }

    /// Wait for the next signal. Returns false once every sender is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
