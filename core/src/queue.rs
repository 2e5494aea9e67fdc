//! Bounded multi-producer / multi-consumer work queue with close-once semantics.
//!
//! The queue is closed when every [`Producer`] handle has been closed or dropped.
//! [`Producer::close`] consumes its handle, so a closed producer can never push again.
//! Consumers keep receiving already-queued items after closure and only observe the end
//! of the queue once it is drained.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, mpsc};

/// Every consumer is gone; the item could not be delivered.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("work queue has no consumers left")]
pub struct QueueClosed;

/// Creates a queue holding at most `capacity` items.
pub fn bounded<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        Producer { tx },
        Consumer {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Sending half. Clone it to add producers.
#[derive(Debug)]
pub struct Producer<T> {
    tx: mpsc::Sender<T>,
}

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> Producer<T> {
    /// Waits for free capacity, then enqueues `item`.
    pub async fn push(&self, item: T) -> Result<(), QueueClosed> {
        self.tx.send(item).await.map_err(|_| QueueClosed)
    }

    /// Signals that this producer will not push anything else.
    pub fn close(self) {
        drop(self);
    }
}

/// Receiving half. Clones share the same underlying queue.
#[derive(Debug)]
pub struct Consumer<T> {
    rx: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for Consumer<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T> Consumer<T> {
    /// Next item in FIFO order, or `None` once the queue is closed and drained.
    pub async fn pop(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
