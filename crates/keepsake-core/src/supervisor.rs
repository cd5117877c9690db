//! Worker process supervision
//!
//! Starts the worker with inherited stdio, waits for it, and forwards
//! termination signals to it.
//!
//! ```text
//! NotStarted -> Running { pid } -> Exited(code) | Killed(signal)
//! ```
//!
//! One supervisor runs at most one worker over its lifetime.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::config::Config;
use crate::shutdown::{ShutdownSignal, SignalTarget};

/// Exit code used when the worker cannot be spawned
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 1;

/// Errors from starting, waiting on, or signaling the worker
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Worker command is empty")]
    EmptyCommand,

    #[error("Failed to start worker '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Worker already started ({state})")]
    AlreadyStarted { state: WorkerState },

    #[error("No worker is running")]
    NotRunning,

    #[error("Failed to wait for worker: {0}")]
    Wait(#[source] io::Error),

    #[error("Failed to send {signal} to worker {pid}: {source}")]
    Signal {
        signal: ShutdownSignal,
        pid: u32,
        #[source]
        source: io::Error,
    },
}

/// Program, arguments, and working directory of the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Split an argv vector into program and arguments
    pub fn from_argv(argv: &[String]) -> Result<Self, SupervisorError> {
        let (program, args) = argv.split_first().ok_or(SupervisorError::EmptyCommand)?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            current_dir: None,
        })
    }

    /// Worker command from configuration, run inside `app_dir`
    pub fn from_config(config: &Config) -> Result<Self, SupervisorError> {
        Ok(Self::from_argv(&config.worker_command)?.current_dir(&config.app_dir))
    }
}

impl fmt::Display for WorkerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Lifecycle state of the supervised worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    NotStarted,
    Running { pid: u32 },
    Exited(i32),
    Killed(i32),
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerState::NotStarted => f.write_str("not started"),
            WorkerState::Running { pid } => write!(f, "running as pid {}", pid),
            WorkerState::Exited(code) => write!(f, "exited with code {}", code),
            WorkerState::Killed(signal) => write!(f, "killed by signal {}", signal),
        }
    }
}

/// How the worker ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Exited on its own with this code
    Exited(i32),
    /// Terminated by this signal number
    Killed(i32),
}

impl WorkerExit {
    /// Code the host process should exit with
    ///
    /// The worker's own code is passed through unchanged. A worker ended by
    /// a signal has no code of its own and counts as a clean stop: that is
    /// the ordinary SIGTERM path when the host platform shuts us down.
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkerExit::Exited(code) => *code,
            WorkerExit::Killed(_) => 0,
        }
    }
}

impl From<ExitStatus> for WorkerExit {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return WorkerExit::Exited(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return WorkerExit::Killed(signal);
            }
        }

        WorkerExit::Exited(1)
    }
}

impl From<WorkerExit> for WorkerState {
    fn from(exit: WorkerExit) -> Self {
        match exit {
            WorkerExit::Exited(code) => WorkerState::Exited(code),
            WorkerExit::Killed(signal) => WorkerState::Killed(signal),
        }
    }
}

/// Launches and monitors a single worker process
pub struct ProcessSupervisor {
    command: WorkerCommand,
    state: WorkerState,
    child: Option<Child>,
}

impl ProcessSupervisor {
    pub fn new(command: WorkerCommand) -> Self {
        Self {
            command,
            state: WorkerState::NotStarted,
            child: None,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Spawn the worker
    ///
    /// Standard input, output and error are inherited, not captured.
    pub fn start(&mut self) -> Result<WorkerHandle, SupervisorError> {
        if self.state != WorkerState::NotStarted {
            return Err(SupervisorError::AlreadyStarted { state: self.state });
        }

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &self.command.current_dir {
            cmd.current_dir(dir);
        }

        let child = cmd.spawn().map_err(|source| SupervisorError::Spawn {
            program: self.command.program.clone(),
            source,
        })?;
        let pid = child.id().ok_or(SupervisorError::NotRunning)?;

        info!(pid, command = %self.command, "Worker started");

        self.state = WorkerState::Running { pid };
        self.child = Some(child);
        Ok(WorkerHandle { pid })
    }

    /// Wait for the worker to exit and record how it ended
    ///
    /// Cancel safe: dropping the future leaves the worker running and the
    /// supervisor in `Running`.
    pub async fn wait(&mut self) -> Result<WorkerExit, SupervisorError> {
        let child = self.child.as_mut().ok_or(SupervisorError::NotRunning)?;
        let status = child.wait().await.map_err(SupervisorError::Wait)?;

        let exit = WorkerExit::from(status);
        debug!(?exit, "Worker reaped");

        self.child = None;
        self.state = exit.into();
        Ok(exit)
    }
}

/// Signals a running worker by pid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerHandle {
    pid: u32,
}

impl WorkerHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl SignalTarget for WorkerHandle {
    /// Send `signal` without waiting for the worker to exit
    ///
    /// A worker that is already gone is not an error.
    #[cfg(unix)]
    fn terminate(&self, signal: ShutdownSignal) -> Result<(), SupervisorError> {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        info!(pid = self.pid, %signal, "Forwarding signal to worker");
        match kill(Pid::from_raw(self.pid as i32), signal.as_nix()) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => {
                debug!(pid = self.pid, "Worker already exited");
                Ok(())
            }
            Err(errno) => Err(SupervisorError::Signal {
                signal,
                pid: self.pid,
                source: io::Error::from(errno),
            }),
        }
    }

    #[cfg(not(unix))]
    fn terminate(&self, signal: ShutdownSignal) -> Result<(), SupervisorError> {
        Err(SupervisorError::Signal {
            signal,
            pid: self.pid,
            source: io::Error::new(
                io::ErrorKind::Unsupported,
                "signal forwarding requires a Unix platform",
            ),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> WorkerCommand {
        WorkerCommand::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn test_from_argv() {
        let argv = vec!["node".to_string(), "server/init.js".to_string()];
        let command = WorkerCommand::from_argv(&argv).unwrap();
        assert_eq!(command.program, "node");
        assert_eq!(command.args, vec!["server/init.js"]);
        assert_eq!(command.to_string(), "node server/init.js");

        assert!(matches!(
            WorkerCommand::from_argv(&[]),
            Err(SupervisorError::EmptyCommand)
        ));
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(WorkerExit::Exited(0).exit_code(), 0);
        assert_eq!(WorkerExit::Exited(3).exit_code(), 3);
        assert_eq!(WorkerExit::Killed(15).exit_code(), 0);
        assert_eq!(WorkerExit::Killed(2).exit_code(), 0);
    }

    #[tokio::test]
    async fn test_exit_code_recorded() {
        let mut supervisor = ProcessSupervisor::new(sh("exit 3"));
        assert_eq!(supervisor.state(), WorkerState::NotStarted);

        let handle = supervisor.start().unwrap();
        assert_eq!(
            supervisor.state(),
            WorkerState::Running { pid: handle.pid() }
        );

        let exit = supervisor.wait().await.unwrap();
        assert_eq!(exit, WorkerExit::Exited(3));
        assert_eq!(supervisor.state(), WorkerState::Exited(3));
    }

    #[tokio::test]
    async fn test_second_start_rejected() {
        let mut supervisor = ProcessSupervisor::new(sh("exit 0"));
        supervisor.start().unwrap();

        let err = supervisor.start().unwrap_err();
        assert!(matches!(err, SupervisorError::AlreadyStarted { .. }));

        supervisor.wait().await.unwrap();
        assert!(matches!(
            supervisor.start(),
            Err(SupervisorError::AlreadyStarted { .. })
        ));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let mut supervisor =
            ProcessSupervisor::new(WorkerCommand::new("/nonexistent/keepsake-worker"));

        let err = supervisor.start().unwrap_err();
        assert!(matches!(err, SupervisorError::Spawn { .. }));
        assert_eq!(supervisor.state(), WorkerState::NotStarted);
    }

    #[tokio::test]
    async fn test_wait_without_start() {
        let mut supervisor = ProcessSupervisor::new(sh("exit 0"));
        assert!(matches!(
            supervisor.wait().await,
            Err(SupervisorError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_terminate_running_worker() {
        let mut supervisor = ProcessSupervisor::new(WorkerCommand::new("sleep").arg("30"));
        let handle = supervisor.start().unwrap();

        handle.terminate(ShutdownSignal::Terminate).unwrap();

        let exit = supervisor.wait().await.unwrap();
        assert_eq!(exit, WorkerExit::Killed(15));
        assert_eq!(exit.exit_code(), 0);
        assert_eq!(supervisor.state(), WorkerState::Killed(15));
    }

    #[tokio::test]
    async fn test_terminate_after_exit_is_ok() {
        let mut supervisor = ProcessSupervisor::new(sh("exit 0"));
        let handle = supervisor.start().unwrap();
        supervisor.wait().await.unwrap();

        assert!(handle.terminate(ShutdownSignal::Interrupt).is_ok());
    }

    #[tokio::test]
    async fn test_worker_runs_in_current_dir() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut supervisor =
            ProcessSupervisor::new(sh("touch started.flag").current_dir(temp_dir.path()));

        supervisor.start().unwrap();
        assert_eq!(supervisor.wait().await.unwrap(), WorkerExit::Exited(0));
        assert!(temp_dir.path().join("started.flag").exists());
    }
}
