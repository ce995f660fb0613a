//! Public entry point: routes a submission to the right executor and
//! applies the result extractor.
//!
//! Pure dispatch, no policy of its own: the strong path's captured text is
//! parsed with [`extract`], the weak path's directly-read value is used
//! as-is, and there is never an automatic fallback between isolation
//! levels — the two paths have different trust and resource guarantees, and
//! conflating them silently would hide that from the caller.

use crate::docker::DockerSandbox;
use crate::extract::{extract, MoveCandidate};
use crate::local::LocalExecutor;
use crate::policy::ResourceLimitPolicy;
use crate::types::{CodeSubmission, ExecutionOutcome, FailureKind, IsolationLevel};

/// Outcome plus the move candidate derived from it.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub outcome: ExecutionOutcome,
    pub candidate: MoveCandidate,
}

/// Dispatches submissions by isolation level.
pub struct Orchestrator {
    docker: Option<DockerSandbox>,
    local: LocalExecutor,
    policy: ResourceLimitPolicy,
}

impl Orchestrator {
    /// Build an orchestrator around an already-connected Docker sandbox.
    /// Pass `None` when the container runtime is unavailable; strong
    /// isolation then reports `EnvironmentUnavailable` instead of silently
    /// downgrading.
    pub fn new(
        docker: Option<DockerSandbox>,
        local: LocalExecutor,
        policy: ResourceLimitPolicy,
    ) -> Self {
        Self {
            docker,
            local,
            policy,
        }
    }

    /// Connect to the container runtime if possible and build the
    /// orchestrator. A failed connection is logged and remembered, not
    /// fatal: weak-isolation submissions still work.
    pub fn connect(policy: ResourceLimitPolicy) -> Self {
        let docker = match DockerSandbox::connect() {
            Ok(docker) => Some(docker),
            Err(e) => {
                tracing::warn!(error = %e, "Container runtime unavailable; strong isolation disabled");
                None
            }
        };
        Self::new(docker, LocalExecutor::new(), policy)
    }

    /// Whether strong isolation is currently available.
    pub fn strong_isolation_available(&self) -> bool {
        self.docker.is_some()
    }

    /// The policy applied to strongly-isolated runs.
    pub fn policy(&self) -> &ResourceLimitPolicy {
        &self.policy
    }

    /// Execute a submission and derive its move candidate. Never returns an
    /// error; every failure is inside the report's outcome.
    pub async fn execute(&self, submission: CodeSubmission) -> ExecutionReport {
        match submission.isolation() {
            IsolationLevel::Strong => self.execute_strong(&submission).await,
            IsolationLevel::Weak => self.execute_weak(submission).await,
        }
    }

    async fn execute_strong(&self, submission: &CodeSubmission) -> ExecutionReport {
        let Some(docker) = &self.docker else {
            let outcome = ExecutionOutcome::failed(
                FailureKind::EnvironmentUnavailable,
                "Container runtime is not available",
                std::time::Duration::ZERO,
            );
            let candidate = MoveCandidate::empty("");
            return ExecutionReport { outcome, candidate };
        };

        let outcome = docker.run(submission, &self.policy).await;
        // Only trust the captured text of a clean run; diagnostics from a
        // failed one are not a move.
        let candidate = if outcome.success {
            extract(&outcome.output)
        } else {
            MoveCandidate::empty(outcome.output.clone())
        };
        ExecutionReport { outcome, candidate }
    }

    async fn execute_weak(&self, submission: CodeSubmission) -> ExecutionReport {
        let local = self.local.clone();
        let result = tokio::task::spawn_blocking(move || local.run(&submission)).await;

        match result {
            Ok(local_outcome) => {
                let raw = local_outcome.outcome.output.clone();
                let candidate = match local_outcome.next_move {
                    Some((row, col)) => MoveCandidate::found(row, col, raw),
                    None => MoveCandidate::empty(raw),
                };
                ExecutionReport {
                    outcome: local_outcome.outcome,
                    candidate,
                }
            }
            Err(e) => {
                let outcome = ExecutionOutcome::failed(
                    FailureKind::RuntimeFault,
                    format!("In-process executor panicked: {e}"),
                    std::time::Duration::ZERO,
                );
                ExecutionReport {
                    outcome,
                    candidate: MoveCandidate::empty(""),
                }
            }
        }
    }
}
