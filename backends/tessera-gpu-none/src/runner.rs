//! Task runners for the decode pipeline
//!
//! Serial channel-fed workers stand in for the UI and IO threads; a
//! small rayon pool plays the concurrent decode pool. The runners only
//! promise what the contract asks: FIFO execution on the serial workers,
//! unordered execution on the pool.

use std::io;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use tessera_image::service::{TaskRunner, TaskRunners};

type Job = Box<dyn FnOnce() + Send>;

/// A named worker thread draining a channel in order.
pub struct SerialTaskRunner {
    sender: Mutex<mpsc::Sender<Job>>,
    thread_id: ThreadId,
}

impl SerialTaskRunner {
    pub fn spawn(name: &str) -> io::Result<Arc<Self>> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    job();
                }
            })?;
        Ok(Arc::new(Self {
            sender: Mutex::new(sender),
            thread_id: handle.thread().id(),
        }))
    }

    /// The worker's thread id, for asserting where callbacks run.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }
}

impl TaskRunner for SerialTaskRunner {
    fn post(&self, task: Job) {
        // The worker only exits once every sender is gone, so a failed
        // send can only mean shutdown; tasks posted during teardown are
        // dropped.
        let _ = self.sender.lock().send(task);
    }
}

/// A rayon pool standing in for the concurrent decode pool.
pub struct RayonTaskRunner {
    pool: rayon::ThreadPool,
}

impl RayonTaskRunner {
    pub fn new(threads: usize) -> Result<Arc<Self>, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("tessera-decode-{index}"))
            .build()?;
        Ok(Arc::new(Self { pool }))
    }
}

impl TaskRunner for RayonTaskRunner {
    fn post(&self, task: Job) {
        self.pool.spawn(move || task());
    }
}

/// The standard runner trio: serial UI and IO workers plus a two-thread
/// decode pool.
pub fn decode_runners() -> io::Result<TaskRunners> {
    let ui = SerialTaskRunner::spawn("tessera-ui")?;
    let io_runner = SerialTaskRunner::spawn("tessera-io")?;
    let concurrent = RayonTaskRunner::new(2)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    Ok(TaskRunners {
        ui,
        io: io_runner,
        concurrent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn serial_runner_executes_in_order() {
        let runner = SerialTaskRunner::spawn("test-serial").unwrap();
        let (done_tx, done_rx) = mpsc::channel();
        let counter = Arc::new(AtomicUsize::new(0));
        for expected in 0..16 {
            let counter = counter.clone();
            let done_tx = done_tx.clone();
            runner.post(Box::new(move || {
                let seen = counter.fetch_add(1, Ordering::SeqCst);
                done_tx.send(seen == expected).ok();
            }));
        }
        for _ in 0..16 {
            assert!(done_rx.recv_timeout(Duration::from_secs(5)).unwrap());
        }
    }

    #[test]
    fn serial_runner_reports_its_thread() {
        let runner = SerialTaskRunner::spawn("test-thread-id").unwrap();
        let (tx, rx) = mpsc::channel();
        runner.post(Box::new(move || {
            tx.send(thread::current().id()).ok();
        }));
        let observed = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(observed, runner.thread_id());
        assert_ne!(observed, thread::current().id());
    }

    #[test]
    fn rayon_runner_executes_posted_tasks() {
        let runner = RayonTaskRunner::new(2).unwrap();
        let (tx, rx) = mpsc::channel();
        for _ in 0..8 {
            let tx = tx.clone();
            runner.post(Box::new(move || {
                tx.send(()).ok();
            }));
        }
        for _ in 0..8 {
            rx.recv_timeout(Duration::from_secs(5)).unwrap();
        }
    }
}
