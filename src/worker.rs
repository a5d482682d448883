use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use crate::configuration::{ReportConfiguration, RunConfiguration};
use crate::error::ContextError;
use crate::generation::{GenerationRun, RunSummary};

type Completion = Result<RunSummary, ContextError>;

/// A generation running on its own thread.
///
/// The outcome is delivered once, through `try_result`, `wait_timeout` or `wait`.
pub struct GenerationHandle {
    cancel: Arc<AtomicBool>,
    receiver: mpsc::Receiver<Completion>,
    thread: Option<thread::JoinHandle<()>>,
}

/// Starts the generation on a background thread and returns immediately.
pub fn spawn_generation(
    run: RunConfiguration,
    configuration: ReportConfiguration,
) -> Result<GenerationHandle, ContextError> {
    let generation = GenerationRun::new(run, configuration);
    spawn(move |cancel| generation.execute(cancel))
}

/// Runs `work` on a background thread, handing it the cancellation flag of the handle.
pub fn spawn<F>(work: F) -> Result<GenerationHandle, ContextError>
where
    F: FnOnce(&AtomicBool) -> Completion + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let (sender, receiver) = mpsc::channel();
    let worker_cancel = Arc::clone(&cancel);

    let thread = thread::Builder::new()
        .name("generation".into())
        .spawn(move || {
            let completion = work(&worker_cancel);
            if sender.send(completion).is_err() {
                log::debug!("The generation finished after its handle was dropped");
            }
        })
        .map_err(|error| {
            ContextError::with_error("Unable to start the generation thread", &error)
        })?;

    Ok(GenerationHandle {
        cancel,
        receiver,
        thread: Some(thread),
    })
}

impl GenerationHandle {
    /// Asks the generation to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Returns the outcome if the generation has completed.
    pub fn try_result(&mut self) -> Option<Completion> {
        match self.receiver.try_recv() {
            Ok(completion) => Some(self.finish(completion)),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(self.finish(Err(worker_lost()))),
        }
    }

    /// Waits at most `timeout` for the outcome.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Completion> {
        match self.receiver.recv_timeout(timeout) {
            Ok(completion) => Some(self.finish(completion)),
            Err(mpsc::RecvTimeoutError::Timeout) => None,
            Err(mpsc::RecvTimeoutError::Disconnected) => Some(self.finish(Err(worker_lost()))),
        }
    }

    /// Blocks until the generation completes.
    pub fn wait(mut self) -> Completion {
        let completion = self.receiver.recv().unwrap_or_else(|_| Err(worker_lost()));
        self.finish(completion)
    }

    fn finish(&mut self, completion: Completion) -> Completion {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("The generation thread panicked");
            }
        }
        completion
    }
}

fn worker_lost() -> ContextError {
    ContextError::with_context("The generation thread stopped without reporting a result")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn summary() -> RunSummary {
        RunSummary {
            output_directory: PathBuf::from("out"),
            documents: Vec::new(),
        }
    }

    #[test]
    fn delivers_the_completion_once() {
        let handle = spawn(|_| Ok(summary())).unwrap();
        assert_eq!(handle.wait(), Ok(summary()));
    }

    #[test]
    fn cancellation_reaches_the_work() {
        let (started_sender, started_receiver) = mpsc::channel();
        let mut handle = spawn(move |cancel| {
            started_sender.send(()).unwrap();
            while !cancel.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(1));
            }
            Err(ContextError::with_context("The generation was cancelled"))
        })
        .unwrap();

        started_receiver.recv().unwrap();
        assert!(handle.try_result().is_none());
        handle.cancel();
        assert!(handle.is_cancelled());
        let completion = handle.wait_timeout(Duration::from_secs(10)).unwrap();
        assert!(completion.is_err());
    }

    #[test]
    fn panicking_work_is_reported() {
        let handle = spawn(|_| panic!("decoder exploded")).unwrap();
        assert!(handle.wait().is_err());
    }
}
