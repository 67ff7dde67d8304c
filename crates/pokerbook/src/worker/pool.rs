use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info};

use crate::coordinator::BookCoordinator;
use crate::error::WorkerError;
use crate::worker::job::{BookRun, RunOutcome};

/// Runs books on background threads. Each run occupies one worker for its
/// whole duration; pages of a book are never spread across workers.
pub struct BookWorkerPool {
    run_sender: Sender<BookRun>,
    result_receiver: Receiver<RunOutcome>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl BookWorkerPool {
    pub fn new(coordinator: Arc<BookCoordinator>, worker_count: usize) -> Result<Self, WorkerError> {
        let worker_count = worker_count.max(1);
        let (run_sender, run_receiver) = bounded::<BookRun>(worker_count * 2);
        let (result_sender, result_receiver) = bounded::<RunOutcome>(worker_count * 2);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let run_rx = run_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_coordinator = Arc::clone(&coordinator);

            let handle = thread::Builder::new()
                .name(format!("book-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(worker_id, run_rx, result_tx, shutdown_flag, worker_coordinator);
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} book workers", worker_count);

        Ok(Self {
            run_sender,
            result_receiver,
            workers,
            shutdown,
        })
    }

    /// Queues a run and returns immediately.
    pub fn submit(&self, run: BookRun) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.run_sender
            .send(run)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    pub fn try_recv_result(&self) -> Option<RunOutcome> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<RunOutcome> {
        self.result_receiver.recv().ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down book worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.run_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All book workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    run_receiver: Receiver<BookRun>,
    result_sender: Sender<RunOutcome>,
    shutdown: Arc<AtomicBool>,
    coordinator: Arc<BookCoordinator>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match run_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(run) => {
                debug!(
                    "Worker {} processing book {} (job {}, run {})",
                    worker_id, run.book_id, run.job_id, run.run_id
                );

                let outcome = execute(&coordinator, run);

                if let Err(e) = result_sender.send(outcome) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} run channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

/// Runs one book, turning a panic into a recorded book-fatal failure.
fn execute(coordinator: &BookCoordinator, run: BookRun) -> RunOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        coordinator.run(run.book_id, run.job_id)
    }));

    match result {
        Ok(Ok(summary)) => RunOutcome::success(run, summary),
        Ok(Err(e)) => RunOutcome::failure(run, e.to_string()),
        Err(payload) => {
            let message = format!("Book run panicked: {}", panic_message(payload.as_ref()));
            error!("{}", message);
            coordinator.record_failure(run.book_id, run.job_id, &message);
            RunOutcome::failure(run, message)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
