//! Bounded work queue between the dispatcher and the worker pool

use std::path::PathBuf;

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};

use crate::error::{FilePrepError, Result};

/// One (source, destination) pair to be transformed
///
/// Created by the dispatcher, consumed exactly once by exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub source: PathBuf,
    pub dest: PathBuf,
}

/// Queue entry: either work or a termination marker
///
/// Markers are not addressed to a particular worker; any worker may consume
/// any marker and exits after consuming one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Item(WorkItem),
    Shutdown,
}

/// Producer end of the bounded FIFO queue, held by the dispatcher
///
/// `push` blocks while the queue is full; this is the system's backpressure,
/// bounding in-flight memory no matter how large the source tree is.
pub struct WorkQueue {
    sender: Sender<Job>,
    capacity: usize,
}

/// Consumer end, cloned into every worker
///
/// `recv` blocks while the queue is empty. A disconnected channel (the
/// dispatcher dropped its end mid-run) is reported as `None` and workers
/// treat it like a termination marker.
#[derive(Clone)]
pub struct WorkReceiver {
    receiver: Receiver<Job>,
}

impl WorkQueue {
    /// Create a bounded queue with its consumer end
    pub fn bounded(capacity: usize) -> (Self, WorkReceiver) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender, capacity }, WorkReceiver { receiver })
    }

    /// Enqueue a work item, blocking while the queue is full
    pub fn push(&self, item: WorkItem) -> Result<()> {
        self.sender
            .send(Job::Item(item))
            .map_err(|_| FilePrepError::worker("Work queue disconnected: all workers exited"))
    }

    /// Enqueue one termination marker if there is room right now
    ///
    /// Returns false when the queue is full or disconnected; the drain loop
    /// simply retries on its next pass.
    pub fn try_push_shutdown(&self) -> bool {
        match self.sender.try_send(Job::Shutdown) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Whether the queue is currently at capacity
    pub fn is_full(&self) -> bool {
        self.sender.is_full()
    }

    /// Configured bound
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl WorkReceiver {
    /// Dequeue the next job, blocking while the queue is empty
    ///
    /// `None` means the producer end is gone and no more jobs will arrive.
    pub fn recv(&self) -> Option<Job> {
        self.receiver.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn item(name: &str) -> WorkItem {
        WorkItem {
            source: PathBuf::from(name),
            dest: PathBuf::from(format!("{}.out", name)),
        }
    }

    #[test]
    fn test_fifo_order() {
        let (queue, receiver) = WorkQueue::bounded(4);
        queue.push(item("a")).unwrap();
        queue.push(item("b")).unwrap();

        assert_eq!(receiver.recv(), Some(Job::Item(item("a"))));
        assert_eq!(receiver.recv(), Some(Job::Item(item("b"))));
    }

    #[test]
    fn test_capacity_backpressure() {
        let (queue, _receiver) = WorkQueue::bounded(2);
        queue.push(item("a")).unwrap();
        queue.push(item("b")).unwrap();

        assert!(queue.is_full());
        // A third non-blocking enqueue must be refused while full
        assert!(!queue.try_push_shutdown());
    }

    #[test]
    fn test_blocking_push_resumes_after_pop() {
        let (queue, receiver) = WorkQueue::bounded(1);
        queue.push(item("a")).unwrap();

        let consumer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            let first = receiver.recv();
            let second = receiver.recv();
            (first, second)
        });

        // Blocks until the consumer drains the first item
        queue.push(item("b")).unwrap();

        let (first, second) = consumer.join().unwrap();
        assert_eq!(first, Some(Job::Item(item("a"))));
        assert_eq!(second, Some(Job::Item(item("b"))));
    }

    #[test]
    fn test_disconnect_observed_by_consumer() {
        let (queue, receiver) = WorkQueue::bounded(2);
        queue.push(item("a")).unwrap();
        drop(queue);

        assert_eq!(receiver.recv(), Some(Job::Item(item("a"))));
        assert_eq!(receiver.recv(), None);
    }

    #[test]
    fn test_any_worker_consumes_any_marker() {
        let (queue, receiver) = WorkQueue::bounded(4);
        assert!(queue.try_push_shutdown());
        assert!(queue.try_push_shutdown());

        let r2 = receiver.clone();
        assert_eq!(receiver.recv(), Some(Job::Shutdown));
        assert_eq!(r2.recv(), Some(Job::Shutdown));
    }
}
