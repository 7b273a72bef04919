//! Outbound handle for one admitted connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dropfour_core::{ConnectionId, ServerMessage};
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// A connected client as seen by the registry.
///
/// Sends never block: frames go into a bounded queue drained by the
/// connection's writer task, so callers may hold the registry lock.
pub struct Participant {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Queue to the WebSocket writer task.
    tx: mpsc::Sender<Arc<String>>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Last time any frame arrived from the client.
    last_seen: Mutex<Instant>,
    /// Frames that could not be queued.
    dropped_messages: AtomicU64,
}

impl Participant {
    /// Create a participant around the writer queue.
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Arc<String>>) -> Self {
        let now = Instant::now();
        Self {
            id,
            tx,
            connected_at: now,
            last_seen: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Queue a serialized frame.
    ///
    /// Returns `false` if the queue is full or the writer is gone, and
    /// counts the drop.
    pub fn send(&self, frame: Arc<String>) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize and queue a server message.
    pub fn send_message(&self, message: &ServerMessage) -> bool {
        self.send(Arc::new(message.to_json()))
    }

    /// Record inbound activity (any frame, including Pong).
    pub fn mark_alive(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the client last sent anything.
    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
