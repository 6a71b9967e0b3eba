//! Per-connection outbound queue.
//!
//! Every connection drains its own queue into its socket, so a slow or dead
//! recipient never stalls anybody else. Ordered frames (roster, draw, clear)
//! go through a FIFO; cursor updates live in per-sender slots where a newer
//! position evicts the undrained older one — a recipient that falls behind
//! sees each peer's latest cursor, not a backlog of stale ones.

use std::collections::{HashMap, VecDeque};

use tokio::sync::{Mutex, Notify};

use chalkline_core::types::ClientId;

pub struct Outbound {
    inner: Mutex<Inner>,
    notify: Notify,
}

#[derive(Default)]
struct Inner {
    frames: VecDeque<String>,
    cursors: HashMap<ClientId, String>,
    cursor_order: VecDeque<ClientId>,
    closed: bool,
}

impl Inner {
    fn pop(&mut self) -> Option<String> {
        if let Some(frame) = self.frames.pop_front() {
            return Some(frame);
        }
        while let Some(id) = self.cursor_order.pop_front() {
            if let Some(frame) = self.cursors.remove(&id) {
                return Some(frame);
            }
        }
        None
    }
}

impl Default for Outbound {
    fn default() -> Self {
        Self::new()
    }
}

impl Outbound {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
        }
    }

    /// Enqueue an ordered frame. Dropped silently if the queue is closed.
    pub async fn push_frame(&self, frame: String) {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return;
        }
        inner.frames.push_back(frame);
        drop(inner);
        self.notify.notify_one();
    }

    /// Enqueue a cursor frame for `sender`, replacing any cursor from the
    /// same sender that has not been drained yet.
    pub async fn push_cursor(&self, sender: &str, frame: String) {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return;
        }
        if inner.cursors.insert(sender.to_string(), frame).is_none() {
            inner.cursor_order.push_back(sender.to_string());
        }
        drop(inner);
        self.notify.notify_one();
    }

    /// Close the queue. Frames already enqueued still drain; new pushes are
    /// dropped and [`next`](Self::next) returns `None` once drained.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.closed = true;
        drop(inner);
        self.notify.notify_one();
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }

    /// Wait for the next frame. Returns `None` when the queue is closed and
    /// fully drained.
    pub async fn next(&self) -> Option<String> {
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(frame) = inner.pop() {
                    return Some(frame);
                }
                if inner.closed {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Non-blocking variant of [`next`](Self::next).
    pub async fn try_next(&self) -> Option<String> {
        self.inner.lock().await.pop()
    }
}
