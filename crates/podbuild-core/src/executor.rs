//! The orchestrator's sequencing contract, and a host-local implementation.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use chrono::Utc;
use podbuild_model::{
    Container, ContainerState, ContainerStateTerminated, ContainerStatus, Pod, PodPhase, PodStatus,
};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::ExecutorError;
use crate::pod::WORKSPACE_DIR;

/// Reported exit code of a unit whose process could not be started.
pub const START_ERROR_EXIT_CODE: i32 = 128;

/// Runs a pod's init containers strictly one at a time, in order, and stops
/// at the first non-zero exit. Units after a failure never start.
///
/// Returns the per-unit terminal state as an orchestrator would report it.
#[async_trait]
pub trait SequenceExecutor: Send + Sync {
    async fn run_sequence(&self, pod: &Pod) -> Result<PodStatus, ExecutorError>;
}

/// Executes units as host processes.
///
/// Images are not pulled; each unit's `command` followed by its `args` is run
/// directly with the unit's environment, its output forwarded to this
/// process's stderr as it is produced. The `/workspace` working directory
/// is mapped onto `workspace` on the host. Units with neither command nor
/// args complete immediately with exit code 0.
pub struct LocalExecutor {
    workspace: PathBuf,
}

impl LocalExecutor {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }

    /// Host directory for a unit's working directory.
    fn host_dir(&self, working_dir: &str) -> PathBuf {
        if working_dir.is_empty() {
            return self.workspace.clone();
        }
        match Path::new(working_dir).strip_prefix(WORKSPACE_DIR) {
            Ok(rest) => self.workspace.join(rest),
            Err(_) => PathBuf::from(working_dir),
        }
    }

    async fn run_unit(&self, unit: &Container) -> ContainerStatus {
        let argv: Vec<&String> = unit.command.iter().chain(unit.args.iter()).collect();
        let Some((program, args)) = argv.split_first() else {
            debug!(unit = %unit.name, "No command; completing immediately");
            return terminated(unit, 0, "Completed", String::new());
        };

        // Unit output is streamed to stderr so stdout stays free for the
        // rendered report.
        let mut cmd = Command::new(program.as_str());
        cmd.args(args.iter().map(|a| a.as_str()))
            .current_dir(self.host_dir(&unit.working_dir))
            .stdin(Stdio::null())
            .stdout(std::io::stderr())
            .stderr(std::io::stderr());
        for env in &unit.env {
            cmd.env(&env.name, &env.value);
        }

        match cmd.status().await {
            Ok(status) => {
                let exit_code = exit_code(status);
                debug!(unit = %unit.name, exit_code, "Unit exited");
                let reason = if exit_code == 0 { "Completed" } else { "Error" };
                terminated(unit, exit_code, reason, String::new())
            }
            Err(e) => terminated(unit, START_ERROR_EXIT_CODE, "StartError", e.to_string()),
        }
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

fn terminated(unit: &Container, exit_code: i32, reason: &str, message: String) -> ContainerStatus {
    ContainerStatus {
        name: unit.name.clone(),
        state: ContainerState {
            terminated: Some(ContainerStateTerminated {
                exit_code,
                reason: reason.to_string(),
                message,
            }),
            ..ContainerState::default()
        },
        image_id: unit.image.clone(),
    }
}

#[async_trait]
impl SequenceExecutor for LocalExecutor {
    async fn run_sequence(&self, pod: &Pod) -> Result<PodStatus, ExecutorError> {
        if pod.spec.init_containers.is_empty() {
            return Err(ExecutorError::EmptySequence(pod.metadata.name.clone()));
        }
        tokio::fs::create_dir_all(&self.workspace).await?;

        let start_time = Utc::now();
        let mut init_statuses = Vec::with_capacity(pod.spec.init_containers.len());
        let mut failed = false;

        for unit in &pod.spec.init_containers {
            if failed {
                init_statuses.push(ContainerStatus::waiting(&unit.name, "PodInitializing", ""));
                continue;
            }

            info!(pod = %pod.metadata.name, unit = %unit.name, "Running unit");
            let status = self.run_unit(unit).await;
            let exit_code = status
                .state
                .terminated
                .as_ref()
                .map(|t| t.exit_code)
                .unwrap_or_default();
            if exit_code != 0 {
                warn!(unit = %unit.name, exit_code, "Unit failed; halting sequence");
                failed = true;
            }
            init_statuses.push(status);
        }

        let mut container_statuses = Vec::with_capacity(pod.spec.containers.len());
        if !failed {
            for container in &pod.spec.containers {
                let status = self.run_unit(container).await;
                if status
                    .state
                    .terminated
                    .as_ref()
                    .is_some_and(|t| t.exit_code != 0)
                {
                    failed = true;
                }
                container_statuses.push(status);
            }
        }

        let phase = if failed {
            PodPhase::Failed
        } else {
            PodPhase::Succeeded
        };
        info!(pod = %pod.metadata.name, ?phase, "Sequence finished");

        Ok(PodStatus {
            phase: Some(phase),
            start_time: Some(start_time),
            init_container_statuses: init_statuses,
            container_statuses,
            ..PodStatus::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podbuild_model::ObjectMeta;

    fn sh(name: &str, script: &str) -> Container {
        Container::new("shell")
            .with_name(name)
            .with_command(["sh", "-c"])
            .with_args([script])
            .with_working_dir(WORKSPACE_DIR)
    }

    fn pod_of(units: Vec<Container>) -> Pod {
        let mut pod = Pod {
            metadata: ObjectMeta::named("ns", "pod-for-test"),
            ..Pod::default()
        };
        pod.spec.init_containers = units;
        pod
    }

    #[test]
    fn test_host_dir_maps_workspace() {
        let exec = LocalExecutor::new("/tmp/ws");
        assert_eq!(exec.host_dir("/workspace"), PathBuf::from("/tmp/ws"));
        assert_eq!(exec.host_dir("/workspace/src"), PathBuf::from("/tmp/ws/src"));
        assert_eq!(exec.host_dir(""), PathBuf::from("/tmp/ws"));
        assert_eq!(exec.host_dir("/etc"), PathBuf::from("/etc"));
    }

    #[tokio::test]
    async fn test_empty_pod_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalExecutor::new(dir.path())
            .run_sequence(&pod_of(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::EmptySequence(_)));
    }

    #[tokio::test]
    async fn test_failure_stops_remaining_units() {
        let dir = tempfile::tempdir().unwrap();
        let pod = pod_of(vec![
            sh("a", "exit 0"),
            sh("b", "exit 3"),
            sh("c", "touch ran-c"),
        ]);

        let status = LocalExecutor::new(dir.path()).run_sequence(&pod).await.unwrap();

        assert_eq!(status.phase, Some(PodPhase::Failed));
        let b = status.init_container_statuses[1].state.terminated.as_ref().unwrap();
        assert_eq!(b.exit_code, 3);
        assert!(status.init_container_statuses[2].state.waiting.is_some());
        assert!(!dir.path().join("ran-c").exists());
    }

    #[tokio::test]
    async fn test_unlaunchable_unit_is_start_error() {
        let dir = tempfile::tempdir().unwrap();
        let unit = Container::new("none")
            .with_name("missing")
            .with_command(["/definitely/not/a/binary"]);

        let status = LocalExecutor::new(dir.path())
            .run_sequence(&pod_of(vec![unit]))
            .await
            .unwrap();
        let term = status.init_container_statuses[0].state.terminated.as_ref().unwrap();
        assert_eq!(term.exit_code, START_ERROR_EXIT_CODE);
        assert_eq!(term.reason, "StartError");
        assert_eq!(status.phase, Some(PodPhase::Failed));
    }

    #[tokio::test]
    async fn test_unit_env_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let unit = sh("env", "test \"$MODE\" = release").with_env("MODE", "release");

        let status = LocalExecutor::new(dir.path())
            .run_sequence(&pod_of(vec![unit]))
            .await
            .unwrap();
        assert_eq!(status.phase, Some(PodPhase::Succeeded));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_signal_death_maps_above_128() {
        let dir = tempfile::tempdir().unwrap();
        let pod = pod_of(vec![sh("killed", "kill -KILL $$")]);

        let status = LocalExecutor::new(dir.path()).run_sequence(&pod).await.unwrap();

        let term = status.init_container_statuses[0].state.terminated.as_ref().unwrap();
        assert_eq!(term.exit_code, 128 + 9);
        assert_eq!(status.phase, Some(PodPhase::Failed));
    }
}
