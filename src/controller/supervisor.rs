//! # Perception Process Supervisor
//!
//! Starts the external perception program when the vehicle arms and stops
//! it when the vehicle disarms or the controller shuts down. At most one
//! child is live at a time.
//!
//! Stopping sends SIGTERM, waits up to the configured timeout, then kills
//! the child and reaps it.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::config::PerceptionConfig;
use crate::error::SupervisorError;

/// Command line of the perception program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl ProcessSpec {
    /// `[launcher] <program> -m <model_path> -c <config_path>`
    pub fn from_config(config: &PerceptionConfig) -> Self {
        let mut args = Vec::with_capacity(5);
        let program = if config.launcher.is_empty() {
            config.program.clone()
        } else {
            args.push(config.program.clone());
            config.launcher.clone()
        };

        args.extend([
            "-m".to_string(),
            config.model_path.clone(),
            "-c".to_string(),
            config.config_path.clone(),
        ]);

        Self { program, args }
    }
}

/// A live perception child
#[derive(Debug)]
pub struct ChildProcessHandle {
    child: Child,
    pid: u32,
}

impl ChildProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { pid: u32 },
    /// A child is already live; nothing was launched
    AlreadyRunning { pid: u32 },
    /// Perception is disabled in the configuration
    Disabled,
}

/// Result of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Exited after the termination request
    Terminated(ExitStatus),
    /// Ignored the termination request and was killed
    Killed(ExitStatus),
    /// No child was live
    NotRunning,
}

/// Owner of the perception child
#[derive(Debug)]
pub struct Supervisor {
    spec: Option<ProcessSpec>,
    stop_timeout: Duration,
    handle: Option<ChildProcessHandle>,
    starts: u64,
    stops: u64,
}

impl Supervisor {
    pub fn new(config: &PerceptionConfig) -> Self {
        Self {
            spec: config.enabled.then(|| ProcessSpec::from_config(config)),
            stop_timeout: config.stop_timeout(),
            handle: None,
            starts: 0,
            stops: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().map(ChildProcessHandle::pid)
    }

    /// Children launched so far
    pub fn starts(&self) -> u64 {
        self.starts
    }

    /// Children stopped by request so far
    pub fn stops(&self) -> u64 {
        self.stops
    }

    /// Launch the perception program unless a child is already live
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Spawn` if the program cannot be launched
    pub fn start(&mut self) -> Result<StartOutcome, SupervisorError> {
        let Some(spec) = &self.spec else {
            return Ok(StartOutcome::Disabled);
        };

        if let Some(handle) = &self.handle {
            debug!("Perception process already running (pid {})", handle.pid);
            return Ok(StartOutcome::AlreadyRunning { pid: handle.pid });
        }

        let spawn_err = |reason: String| SupervisorError::Spawn {
            program: spec.program.clone(),
            reason,
        };

        let child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_err(e.to_string()))?;

        let pid = child
            .id()
            .ok_or_else(|| spawn_err("failed to get process ID".to_string()))?;

        info!("Perception process started (pid {}): {} {}", pid, spec.program, spec.args.join(" "));
        self.handle = Some(ChildProcessHandle { child, pid });
        self.starts += 1;
        Ok(StartOutcome::Started { pid })
    }

    /// Terminate the live child and wait for it
    ///
    /// Idempotent: returns `StopOutcome::NotRunning` when no child is live.
    /// The handle is cleared before waiting, so it is gone even if the wait
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns `SupervisorError::Wait` or `SupervisorError::Kill` if the
    /// child could not be reaped
    pub async fn stop(&mut self) -> Result<StopOutcome, SupervisorError> {
        let Some(ChildProcessHandle { mut child, pid }) = self.handle.take() else {
            return Ok(StopOutcome::NotRunning);
        };
        self.stops += 1;

        if let Err(e) = request_terminate(&mut child, pid) {
            warn!("{}, killing instead", e);
        }

        match tokio::time::timeout(self.stop_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                info!("Perception process stopped (pid {}, {})", pid, status);
                Ok(StopOutcome::Terminated(status))
            }
            Ok(Err(e)) => Err(SupervisorError::Wait {
                pid,
                reason: e.to_string(),
            }),
            Err(_) => {
                warn!(
                    "Perception process (pid {}) still running after {:?}, killing",
                    pid, self.stop_timeout
                );
                child.kill().await.map_err(|e| SupervisorError::Kill {
                    pid,
                    reason: e.to_string(),
                })?;
                let status = child.wait().await.map_err(|e| SupervisorError::Wait {
                    pid,
                    reason: e.to_string(),
                })?;
                info!("Perception process killed (pid {}, {})", pid, status);
                Ok(StopOutcome::Killed(status))
            }
        }
    }

    /// Reap a child that exited on its own
    ///
    /// Clears the handle and returns the exit status if the child is gone.
    /// The child is not restarted.
    pub fn poll_exited(&mut self) -> Option<ExitStatus> {
        let handle = self.handle.as_mut()?;
        match handle.child.try_wait() {
            Ok(Some(status)) => {
                self.handle = None;
                Some(status)
            }
            Ok(None) => None,
            Err(e) => {
                debug!("Failed to poll perception process (pid {}): {}", handle.pid, e);
                None
            }
        }
    }
}

/// Ask the child to exit gracefully
#[cfg(unix)]
fn request_terminate(_child: &mut Child, pid: u32) -> Result<(), SupervisorError> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    #[allow(clippy::cast_possible_wrap)]
    let target = Pid::from_raw(pid as i32);
    match kill(target, Signal::SIGTERM) {
        // Already exited, the wait will reap it
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(SupervisorError::Signal {
            pid,
            reason: e.to_string(),
        }),
    }
}

#[cfg(not(unix))]
fn request_terminate(child: &mut Child, pid: u32) -> Result<(), SupervisorError> {
    child.start_kill().map_err(|e| SupervisorError::Signal {
        pid,
        reason: e.to_string(),
    })
}
