// Closable synchronized FIFO.
//
// Carries work items to the scan workers and finished records to the
// serializer. Producers close the queue once no more items will arrive;
// consumers block until an item or the close flag shows up.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Error returned when pushing to a queue that has already been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedQueue;

impl std::fmt::Display for ClosedQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "push to a closed queue")
    }
}

impl std::error::Error for ClosedQueue {}

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Unbounded FIFO with a sticky close flag.
///
/// `wait_and_pop` returns `None` only once the queue is both closed and
/// drained; items pushed before `close` are always delivered first, and
/// each item is observed by exactly one consumer.
pub struct SyncQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

impl<T> SyncQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append an item. Fails if the queue has been closed.
    pub fn push(&self, item: T) -> Result<(), ClosedQueue> {
        let mut state = self.state.lock().expect("queue lock poisoned");
        if state.closed {
            return Err(ClosedQueue);
        }
        state.items.push_back(item);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Pop the next item, blocking while the queue is empty but open.
    /// Returns `None` once the queue is closed and empty.
    pub fn wait_and_pop(&self) -> Option<T> {
        let mut state = self.state.lock().expect("queue lock poisoned");
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self
                .available
                .wait(state)
                .expect("queue lock poisoned");
        }
    }

    /// Close the queue and wake all waiting consumers. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock().expect("queue lock poisoned");
        state.closed = true;
        drop(state);
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().expect("queue lock poisoned").closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("queue lock poisoned").items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for SyncQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SyncQueue<T> {
    fn drop(&mut self) {
        // Dropping undelivered items means the consumer protocol was broken.
        if !std::thread::panicking() {
            debug_assert!(
                self.state.get_mut().map_or(true, |s| s.items.is_empty()),
                "dropping a non-empty queue"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fifo_order() {
        let q = SyncQueue::new();
        q.push(1).unwrap();
        q.push(2).unwrap();
        q.push(3).unwrap();
        assert_eq!(q.len(), 3);
        assert_eq!(q.wait_and_pop(), Some(1));
        assert_eq!(q.wait_and_pop(), Some(2));
        assert_eq!(q.wait_and_pop(), Some(3));
        assert!(q.is_empty());
        q.close();
    }

    #[test]
    fn close_is_sticky_and_rejects_push() {
        let q = SyncQueue::new();
        q.push(7).unwrap();
        q.close();
        q.close();
        assert!(q.is_closed());
        assert_eq!(q.push(8), Err(ClosedQueue));
        // Items pushed before close are still delivered before None.
        assert_eq!(q.wait_and_pop(), Some(7));
        assert_eq!(q.wait_and_pop(), None);
        assert_eq!(q.wait_and_pop(), None);
    }

    #[test]
    fn blocked_consumer_wakes_on_push() {
        let q = Arc::new(SyncQueue::new());
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.wait_and_pop())
        };
        q.push(42).unwrap();
        assert_eq!(consumer.join().unwrap(), Some(42));
        q.close();
    }

    #[test]
    fn blocked_consumer_wakes_on_close() {
        let q: Arc<SyncQueue<i32>> = Arc::new(SyncQueue::new());
        let consumer = {
            let q = Arc::clone(&q);
            thread::spawn(move || q.wait_and_pop())
        };
        q.close();
        assert_eq!(consumer.join().unwrap(), None);
    }

    #[test]
    fn many_consumers_each_item_delivered_once() {
        let q = Arc::new(SyncQueue::new());
        for i in 0..1000 {
            q.push(i).unwrap();
        }
        let mut handles = Vec::new();
        for _ in 0..5 {
            let q = Arc::clone(&q);
            handles.push(thread::spawn(move || {
                let mut seen = Vec::new();
                while let Some(v) = q.wait_and_pop() {
                    seen.push(v);
                }
                seen
            }));
        }
        q.close();
        let mut all: Vec<i32> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());
    }
}
