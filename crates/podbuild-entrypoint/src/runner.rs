//! Running the wrapped command.

use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::EntrypointError;

#[async_trait]
pub trait Runner: Send + Sync {
    /// Run `args[0]` with `args[1..]` and return its exit code.
    ///
    /// A non-zero exit is a normal return, not an error. Errors are reserved
    /// for failing to start the process at all.
    async fn run(&self, args: &[String]) -> Result<i32, EntrypointError>;
}

/// Runs the command as a child process sharing this process's stdio.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl Runner for ProcessRunner {
    async fn run(&self, args: &[String]) -> Result<i32, EntrypointError> {
        let Some((program, rest)) = args.split_first() else {
            debug!("Empty command line; nothing to run");
            return Ok(0);
        };

        info!(program = %program, args = ?rest, "Starting step");
        let status = Command::new(program)
            .args(rest)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| EntrypointError::Spawn {
                program: program.clone(),
                source,
            })?;

        let code = exit_code(status);
        info!(program = %program, code, "Step exited");
        Ok(code)
    }
}

/// Exit code as a shell would report it: killed by signal N becomes 128+N.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
