//! Docker-backed sandbox lifecycle manager.
//!
//! One container per submission: the code is staged into a throwaway
//! directory, bind-mounted read-only, and run under the full
//! [`ResourceLimitPolicy`] with the network disabled and a read-only root.
//! The same task provisions, polls, and tears down — the invariant that
//! every started handle is eventually removed holds by structure, with no
//! background watchdog to coordinate with.
//!
//! `run` never returns an error: every failure branch is folded into an
//! [`ExecutionOutcome`] with a [`FailureKind`] category. Teardown failures
//! are logged and never override the primary outcome.

use crate::policy::ResourceLimitPolicy;
use crate::types::{CodeSubmission, ExecutionOutcome, FailureKind, HandleState, SandboxHandle};
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::Docker;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::time::Instant;
use tempfile::TempDir;

/// Filename the staged submission is written to; the only thing the
/// container is ever asked to run.
const CODE_FILENAME: &str = "user_code.py";

/// Strong-isolation executor backed by the Docker daemon.
pub struct DockerSandbox {
    client: Docker,
}

impl DockerSandbox {
    /// Connect to the local Docker daemon. A connection failure here means
    /// strong isolation is unavailable; callers surface that as
    /// `EnvironmentUnavailable` rather than downgrading silently.
    pub fn connect() -> gomoku_common::Result<Self> {
        let client = Docker::connect_with_local_defaults()
            .map_err(|e| gomoku_common::Error::Sandbox(format!("Docker connect failed: {e}")))?;
        Ok(Self { client })
    }

    /// Check that the daemon is reachable and responsive.
    pub async fn health_check(&self) -> bool {
        self.client.ping().await.is_ok()
    }

    /// Execute a submission under the given policy. Blocks the calling task
    /// for up to `policy.timeout` plus teardown time.
    pub async fn run(
        &self,
        submission: &CodeSubmission,
        policy: &ResourceLimitPolicy,
    ) -> ExecutionOutcome {
        let start = Instant::now();

        // 1. Stage the code into a fresh, caller-invisible directory. The
        // TempDir guard deletes it on every exit path from this function.
        let stage = match stage_code(submission.code()) {
            Ok(stage) => stage,
            Err(e) => {
                return ExecutionOutcome::failed(
                    FailureKind::ProvisioningFailed,
                    format!("Failed to stage code: {e}"),
                    start.elapsed(),
                );
            }
        };

        // 2. Base image present, or exactly one pull attempt.
        if let Err(e) = self.ensure_image(&policy.image).await {
            return ExecutionOutcome::failed(
                FailureKind::EnvironmentUnavailable,
                format!("Image {} unavailable: {e}", policy.image),
                start.elapsed(),
            );
        }

        // 3. Create the environment with the full policy applied.
        let mut handle = match self.create_sandbox(&stage, policy).await {
            Ok(handle) => handle,
            Err(e) => {
                return ExecutionOutcome::failed(
                    FailureKind::ProvisioningFailed,
                    format!("Failed to create sandbox: {e}"),
                    start.elapsed(),
                );
            }
        };

        // 4-7. Start, monitor, and collect. Teardown runs unconditionally
        // afterwards, whatever the outcome was.
        let outcome = self.supervise(&mut handle, policy, start).await;
        self.teardown(&mut handle).await;

        tracing::info!(
            container = %handle.name(),
            success = outcome.success,
            failure = ?outcome.failure,
            duration_ms = outcome.duration.as_millis() as u64,
            "Sandbox run finished"
        );
        outcome
    }

    /// Pull the image if it is not present locally. Called once per run;
    /// a pull failure is terminal for the submission.
    async fn ensure_image(&self, image: &str) -> Result<(), bollard::errors::Error> {
        if self.client.inspect_image(image).await.is_ok() {
            return Ok(());
        }

        tracing::info!(image = %image, "Base image missing, pulling");
        let (name, tag) = image.split_once(':').unwrap_or((image, "latest"));
        let options = CreateImageOptions {
            from_image: name,
            tag,
            ..Default::default()
        };

        let mut stream = self.client.create_image(Some(options), None, None);
        while let Some(progress) = stream.next().await {
            progress?;
        }
        Ok(())
    }

    /// Create the container with every ceiling from the policy applied.
    async fn create_sandbox(
        &self,
        stage: &TempDir,
        policy: &ResourceLimitPolicy,
    ) -> Result<SandboxHandle, bollard::errors::Error> {
        let name = format!(
            "gomoku-sandbox-{}",
            uuid::Uuid::new_v4().simple().to_string()[..8].to_owned()
        );

        let mut tmpfs = HashMap::new();
        tmpfs.insert("/tmp".to_string(), policy.scratch_mount_options());

        let host_config = bollard::service::HostConfig {
            memory: Some(policy.memory_limit as i64),
            memory_swap: Some(policy.memswap_limit as i64),
            cpu_period: Some(policy.cpu_period as i64),
            cpu_quota: Some(policy.cpu_quota as i64),
            pids_limit: Some(policy.pids_limit as i64),
            network_mode: Some(if policy.network_enabled {
                "bridge".to_string()
            } else {
                "none".to_string()
            }),
            readonly_rootfs: Some(true),
            tmpfs: Some(tmpfs),
            binds: Some(vec![format!(
                "{}:{}:ro",
                stage.path().display(),
                policy.workdir
            )]),
            auto_remove: Some(false),
            ..Default::default()
        };

        let config = Config {
            image: Some(policy.image.clone()),
            cmd: Some(vec!["python".to_string(), CODE_FILENAME.to_string()]),
            working_dir: Some(policy.workdir.clone()),
            host_config: Some(host_config),
            tty: Some(false),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };

        let created = self
            .client
            .create_container(
                Some(CreateContainerOptions {
                    name: name.as_str(),
                    platform: None,
                }),
                config,
            )
            .await?;

        Ok(SandboxHandle::new(created.id, name))
    }

    /// Start the workload and poll its run state until it exits or the
    /// wall-clock budget runs out. Does not remove the container; teardown
    /// belongs to the caller so it runs on every path.
    async fn supervise(
        &self,
        handle: &mut SandboxHandle,
        policy: &ResourceLimitPolicy,
        start: Instant,
    ) -> ExecutionOutcome {
        if let Err(e) = self
            .client
            .start_container(handle.id(), None::<StartContainerOptions<String>>)
            .await
        {
            return ExecutionOutcome::failed(
                FailureKind::StartFailed,
                format!("Failed to start sandbox: {e}"),
                start.elapsed(),
            );
        }
        handle.advance(HandleState::Started);

        // The wall-clock budget covers the workload only. Staging, image
        // pulls, and container creation happen before this point and must
        // not eat into it; `start` is kept solely for the reported duration.
        let deadline = Instant::now();

        loop {
            if deadline.elapsed() >= policy.timeout {
                handle.advance(HandleState::TimedOut);
                self.stop_gracefully(handle, policy).await;
                let output = self.collect_output(handle.id()).await;
                return ExecutionOutcome::timed_out(output, start.elapsed());
            }

            tokio::time::sleep(policy.poll_interval).await;

            let state = match self
                .client
                .inspect_container(handle.id(), None::<InspectContainerOptions>)
                .await
            {
                Ok(inspect) => inspect.state,
                Err(e) => {
                    return ExecutionOutcome::failed(
                        FailureKind::EnvironmentUnavailable,
                        format!("Lost track of sandbox while polling: {e}"),
                        start.elapsed(),
                    );
                }
            };

            let running = state.as_ref().and_then(|s| s.running).unwrap_or(false);
            if running {
                handle.advance(HandleState::Running);
                continue;
            }

            handle.advance(HandleState::Exited);
            let exit_code = state.and_then(|s| s.exit_code).unwrap_or(-1);
            let output = self.collect_output(handle.id()).await;
            return if exit_code == 0 {
                ExecutionOutcome::completed(output, start.elapsed())
            } else {
                ExecutionOutcome::exited_non_zero(exit_code, output, start.elapsed())
            };
        }
    }

    /// Graceful stop with the policy's grace period. The force remove in
    /// teardown covers the case where this fails.
    async fn stop_gracefully(&self, handle: &SandboxHandle, policy: &ResourceLimitPolicy) {
        let grace = policy.stop_grace.as_secs().max(1) as i64;
        if let Err(e) = self
            .client
            .stop_container(handle.id(), Some(StopContainerOptions { t: grace }))
            .await
        {
            tracing::warn!(container = %handle.name(), error = %e, "Graceful stop failed");
        }
    }

    /// Combined stdout/stderr captured so far, in arrival order. Log
    /// retrieval errors degrade to whatever was collected.
    async fn collect_output(&self, container_id: &str) -> String {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: false,
            ..Default::default()
        };

        let mut output = String::new();
        let mut stream = self.client.logs(container_id, Some(options));
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(LogOutput::StdOut { message }) | Ok(LogOutput::StdErr { message }) => {
                    output.push_str(&String::from_utf8_lossy(&message));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Error collecting sandbox output");
                    break;
                }
            }
        }
        output
    }

    /// Force-remove the container. Failures are logged, never propagated:
    /// losing the real outcome to a cleanup error would be strictly worse
    /// for the caller. The handle is marked removed once the attempt has
    /// been made.
    async fn teardown(&self, handle: &mut SandboxHandle) {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        if let Err(e) = self.client.remove_container(handle.id(), Some(options)).await {
            tracing::warn!(container = %handle.name(), error = %e, "Sandbox removal failed");
        }
        handle.advance(HandleState::Removed);
    }
}

/// Write the submission to a fresh scratch directory that will be mounted
/// read-only into the sandbox. Dropping the returned guard deletes it.
fn stage_code(code: &str) -> std::io::Result<TempDir> {
    let stage = TempDir::new()?;
    std::fs::write(stage.path().join(CODE_FILENAME), code)?;
    Ok(stage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_writes_the_code_file() {
        let stage = stage_code("next_move = (7, 7)\nprint(next_move)").unwrap();
        let staged = std::fs::read_to_string(stage.path().join(CODE_FILENAME)).unwrap();
        assert!(staged.contains("next_move"));

        let path = stage.path().to_path_buf();
        drop(stage);
        assert!(!path.exists(), "stage directory must vanish on drop");
    }
}
