//! Lifecycle of the external simulator process.
//!
//! The simulator is started in its own process group with stdout/stderr
//! redirected to log files, and torn down by signalling the whole group so
//! that any helper processes it forked go with it.

use std::fs::{self, File};
use std::path::Path;
use std::process::{Child, Command, Stdio};

use marioai_core::config::SimulatorConfig;
use tracing::{debug, info, warn};

use crate::error::SupervisorError;

/// Check that `program` can be executed by running `{program} -version`.
///
/// Returns the first line the runtime printed (on either stream).
///
/// # Errors
///
/// Returns [`SupervisorError::RuntimeNotFound`] if the program cannot be
/// started at all.
pub fn check_runtime(program: &str) -> Result<String, SupervisorError> {
    let output = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .map_err(|source| SupervisorError::RuntimeNotFound {
            program: program.to_owned(),
            source,
        })?;

    // java prints its version on stderr
    let text = if output.stdout.is_empty() {
        output.stderr
    } else {
        output.stdout
    };
    let version = String::from_utf8_lossy(&text)
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_owned();
    debug!(program, %version, "runtime found");
    Ok(version)
}

// ---------------------------------------------------------------------------
// ServerProcess
// ---------------------------------------------------------------------------

/// A running simulator child process.
///
/// Dropping a `ServerProcess` terminates it.
#[derive(Debug)]
pub struct ServerProcess {
    child: Option<Child>,
    pid: u32,
}

impl ServerProcess {
    /// Start the simulator described by `config`.
    ///
    /// Creates `log_dir` if needed and opens `server_logOut.log` and
    /// `server_logErr.log` there for the child's output.
    ///
    /// # Errors
    ///
    /// - [`SupervisorError::RuntimeNotFound`] if `check_runtime` is set and the
    ///   runtime is missing
    /// - [`SupervisorError::LogFile`] if the log directory or files cannot be
    ///   created
    /// - [`SupervisorError::Spawn`] if the process fails to start
    pub fn launch(config: &SimulatorConfig) -> Result<Self, SupervisorError> {
        if config.check_runtime {
            check_runtime(&config.program)?;
        }

        fs::create_dir_all(&config.log_dir).map_err(|source| SupervisorError::LogFile {
            path: config.log_dir.clone(),
            source,
        })?;
        let (out_path, err_path) = config.log_paths();
        let stdout = create_log(&out_path)?;
        let stderr = create_log(&err_path)?;

        let mut command = Command::new(&config.program);
        command
            .args(&config.args)
            .current_dir(&config.working_dir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn().map_err(|source| SupervisorError::Spawn {
            program: config.program.clone(),
            source,
        })?;
        let pid = child.id();
        info!(pid, program = %config.program, "simulator started");

        Ok(Self {
            child: Some(child),
            pid,
        })
    }

    /// OS process id of the simulator.
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the process has not exited yet.
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Stop the process group and reap the child. Calling it again has no
    /// effect.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Signal`] if the child cannot be reaped.
    pub fn terminate(&mut self) -> Result<(), SupervisorError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let running = matches!(child.try_wait(), Ok(None));
        if let Err(err) = signal_group(self.pid) {
            if running {
                warn!(pid = self.pid, error = %err, "could not signal process group");
            } else {
                debug!(pid = self.pid, error = %err, "process group already gone");
            }
        }
        // Already-exited children report an error here; harmless.
        let _ = child.kill();
        let status = child.wait().map_err(SupervisorError::Signal)?;
        info!(pid = self.pid, %status, "simulator stopped");
        Ok(())
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        if let Err(err) = self.terminate() {
            warn!(pid = self.pid, error = %err, "failed to stop simulator");
        }
    }
}

fn create_log(path: &Path) -> Result<File, SupervisorError> {
    File::create(path).map_err(|source| SupervisorError::LogFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Send SIGTERM to the process group led by `pid`.
#[cfg(unix)]
fn signal_group(pid: u32) -> Result<(), SupervisorError> {
    let status = Command::new("kill")
        .args(["-s", "TERM", "--", &format!("-{pid}")])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(SupervisorError::Signal)?;
    if status.success() {
        Ok(())
    } else {
        Err(SupervisorError::Signal(std::io::Error::other(format!(
            "kill exited with {status}"
        ))))
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: u32) -> Result<(), SupervisorError> {
    Ok(())
}

/// Whether `pid` has exited: gone from `/proc`, or a zombie nobody reaped.
#[cfg(all(test, target_os = "linux"))]
pub(crate) fn has_exited(pid: u32) -> bool {
    let Ok(stat) = fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return true;
    };
    // state follows the parenthesised command name
    stat.rsplit_once(')')
        .and_then(|(_, rest)| rest.split_whitespace().next())
        .map_or(true, |state| state == "Z" || state == "X")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
