//! Sequential installation runner
//!
//! A [`JobRunner`] owns the items of one run. [`JobRunner::start`] consumes
//! it and moves the work onto a dedicated thread, so a runner can only run
//! once. Items are launched one at a time, in order, each inside a terminal
//! window, and the first failure stops the run. Progress is reported as
//! [`JobEvent`]s over a channel that the caller drains on its own schedule.

use crate::error::{ManagerError, Result};
use crate::launch::LaunchEnvironment;
use crate::programs::absolutize;
use crate::queue::{ItemKind, QueuedItem};
use crate::terminal::{HoldMode, Terminal};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every item installed
    Completed,
    /// An item failed; later items were not started
    Failed,
    /// Stopped between items on request
    Cancelled,
}

/// Notification sent from the worker thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Started { index: usize, name: String },
    Completed { index: usize, name: String },
    Failed { index: usize, name: String, output: String },
    /// Always the last event of a run, sent exactly once
    Finished(RunOutcome),
}

/// Shared cancellation flag, checked between items
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Settings that apply to every item of a run
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Pass `-q` to the component installer
    pub silent: bool,
    pub component_installer: PathBuf,
    pub terminal: Terminal,
}

/// A run that has not started yet
pub struct JobRunner {
    items: Vec<QueuedItem>,
    env: LaunchEnvironment,
    options: RunnerOptions,
}

impl JobRunner {
    pub fn new(items: Vec<QueuedItem>, env: LaunchEnvironment, options: RunnerOptions) -> Self {
        Self {
            items,
            env,
            options,
        }
    }

    /// Spawn the worker thread
    pub fn start(self) -> Result<RunHandle> {
        if self.items.is_empty() {
            return Err(ManagerError::EmptyQueue);
        }

        let (tx, rx) = unbounded();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();

        info!(
            "Starting installation of {} item(s) in {}",
            self.items.len(),
            self.env.name()
        );

        let worker = thread::Builder::new()
            .name("installer".into())
            .spawn(move || {
                let outcome = self.run(&worker_cancel, &tx);
                info!("Installation finished: {:?}", outcome);
                let _ = tx.send(JobEvent::Finished(outcome));
                outcome
            })?;

        Ok(RunHandle {
            events: rx,
            cancel,
            worker,
        })
    }

    fn run(&self, cancel: &CancelToken, tx: &Sender<JobEvent>) -> RunOutcome {
        for (index, item) in self.items.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(
                    "Cancelled before {}, {} item(s) left unprocessed",
                    item.display_name,
                    self.items.len() - index
                );
                return RunOutcome::Cancelled;
            }

            let name = item.display_name.clone();
            emit(tx, JobEvent::Started { index, name: name.clone() });

            match self.install(item) {
                Ok(()) => {
                    info!("Installed {}", name);
                    emit(tx, JobEvent::Completed { index, name });
                }
                Err(e) => {
                    error!("Installing {} failed: {}", name, e);
                    emit(
                        tx,
                        JobEvent::Failed {
                            index,
                            name,
                            output: failure_text(&e),
                        },
                    );
                    return RunOutcome::Failed;
                }
            }
        }

        RunOutcome::Completed
    }

    fn install(&self, item: &QueuedItem) -> Result<()> {
        let mut cmd = self.command_for(item)?;
        debug!("Running {:?}", cmd);

        let output = cmd.output().map_err(|e| ManagerError::CommandExecution {
            command: format!("{:?}", cmd),
            error: e.to_string(),
        })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let text = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };

        Err(ManagerError::CommandFailed {
            code: output.status.code(),
            output: text,
        })
    }

    /// Terminal command line for one item
    fn command_for(&self, item: &QueuedItem) -> Result<Command> {
        let mut cmd = match &item.kind {
            ItemKind::Package(path) => {
                if !path.exists() {
                    return Err(ManagerError::MissingFile(path.clone()));
                }
                let path = absolutize(path)?;
                let argv: [OsString; 2] = [self.env.wine().into(), path.into_os_string()];
                self.options.terminal.command(HoldMode::NoClose, argv)
            }
            ItemKind::Component(name) => {
                let mut argv: Vec<OsString> = vec![
                    self.options.component_installer.clone().into_os_string(),
                    "--force".into(),
                ];
                if self.options.silent {
                    argv.push("-q".into());
                }
                argv.push(name.into());
                self.options.terminal.command(HoldMode::Hold, argv)
            }
        };

        self.env.apply(&mut cmd);
        Ok(cmd)
    }
}

fn emit(tx: &Sender<JobEvent>, event: JobEvent) {
    if tx.send(event).is_err() {
        warn!("Progress receiver dropped; continuing without notifications");
    }
}

fn failure_text(error: &ManagerError) -> String {
    match error {
        ManagerError::CommandFailed { output, .. } if !output.is_empty() => output.clone(),
        other => other.to_string(),
    }
}

/// A run in progress
pub struct RunHandle {
    events: Receiver<JobEvent>,
    cancel: CancelToken,
    worker: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Progress notifications, in order, ending with [`JobEvent::Finished`]
    pub fn events(&self) -> &Receiver<JobEvent> {
        &self.events
    }

    /// Token that stops the run before the next item
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Ask the worker to stop; the item already running is allowed to finish
    pub fn cancel(&self) {
        info!("Cancellation requested");
        self.cancel.cancel();
    }

    /// Wait for the worker thread
    pub fn join(self) -> RunOutcome {
        match self.worker.join() {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Installer thread panicked");
                RunOutcome::Failed
            }
        }
    }
}
