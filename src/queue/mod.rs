//! PriorityQueue: bounded, FIFO-within-band request queue.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::error::McpError;
use crate::types::{Priority, Request};

/// Priority weights (spec §4.2 defaults: high=100, normal=50, low=10).
/// Any strict ordering works; these particular values are the spec's own
/// example, kept so the weight a caller sees in logs matches the doc.
fn weight_of(priority: Priority) -> u32 {
    match priority {
        Priority::Low => 10,
        Priority::Normal => 50,
        Priority::High => 100,
    }
}

struct QueueEntry {
    weight: u32,
    sequence: u64,
    request: Request,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.weight == other.weight && self.sequence == other.sequence
    }
}
impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    /// `BinaryHeap` is a max-heap: highest weight pops first; ties broken
    /// by the *smallest* sequence number (oldest submitted), achieved by
    /// wrapping the sequence in `Reverse` before comparing.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.weight, Reverse(self.sequence)).cmp(&(other.weight, Reverse(other.sequence)))
    }
}

struct Inner {
    heap: BinaryHeap<QueueEntry>,
    capacity: usize,
}

/// Thread-safe bounded queue keyed by `(priority_weight, sequence_no)`.
/// Capacity enforcement happens synchronously in `push`, so a caller never
/// blocks beyond the enqueue step — an at-capacity queue fails the request
/// with `QueueFull` immediately instead of waiting for room (spec §4.2).
pub struct PriorityQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    next_sequence: AtomicU64,
    capacity: usize,
}

impl PriorityQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                capacity,
            }),
            notify: Notify::new(),
            next_sequence: AtomicU64::new(0),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Assign the next monotonically increasing sequence number (spec
    /// §4.1, "ties in priority break oldest-first").
    fn next_seq(&self) -> u64 {
        self.next_sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Enqueue a request. Returns `QueueFull` synchronously if the queue is
    /// at capacity; never drops an already-accepted request.
    pub async fn push(&self, priority: Priority, request: Request) -> Result<(), McpError> {
        let mut inner = self.inner.lock().await;
        if inner.heap.len() >= inner.capacity {
            return Err(McpError::QueueFull {
                capacity: inner.capacity,
            });
        }
        let entry = QueueEntry {
            weight: weight_of(priority),
            sequence: self.next_seq(),
            request,
        };
        inner.heap.push(entry);
        drop(inner);
        self.notify.notify_one();
        Ok(())
    }

    /// Pop the highest-weight, oldest-within-band entry. Blocks until an
    /// entry is available; used by dispatcher worker tasks.
    pub async fn pop(&self) -> Request {
        loop {
            {
                let mut inner = self.inner.lock().await;
                if let Some(entry) = inner.heap.pop() {
                    return entry.request;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Non-blocking pop for tests and best-effort draining.
    pub async fn try_pop(&self) -> Option<Request> {
        let mut inner = self.inner.lock().await;
        inner.heap.pop().map(|e| e.request)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.heap.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Spawn `worker_count` tokio tasks draining `queue`, each calling
/// `handler` for every popped request (spec §5, "dispatcher pool").
pub fn spawn_dispatchers<F, Fut>(
    queue: Arc<PriorityQueue>,
    worker_count: usize,
    handler: F,
) -> Vec<tokio::task::JoinHandle<()>>
where
    F: Fn(Request) -> Fut + Send + Sync + Clone + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    (0..worker_count)
        .map(|_| {
            let queue = queue.clone();
            let handler = handler.clone();
            tokio::spawn(async move {
                loop {
                    let request = queue.pop().await;
                    handler(request).await;
                }
            })
        })
        .collect()
}
