//! Submission and outcome types for sandboxed execution.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How strongly the submitted code is isolated from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationLevel {
    /// Per-submission container: resource ceilings, no network, read-only
    /// code mount, enforced timeout.
    Strong,
    /// In-process interpreter with a restricted namespace. No OS-level
    /// ceilings, no timeout, host network reachable.
    Weak,
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strong => write!(f, "strong"),
            Self::Weak => write!(f, "weak"),
        }
    }
}

/// Runtime context made visible to the submitted code: a board snapshot
/// (0 empty, 1 black, 2 white) and the player the code moves for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveContext {
    pub cells: Vec<Vec<u8>>,
    pub player: u8,
}

impl MoveContext {
    pub fn new(cells: Vec<Vec<u8>>, player: u8) -> Self {
        Self { cells, player }
    }
}

/// One piece of untrusted source text plus everything needed to run it.
/// Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSubmission {
    code: String,
    isolation: IsolationLevel,
    context: MoveContext,
}

impl CodeSubmission {
    pub fn new(code: impl Into<String>, isolation: IsolationLevel, context: MoveContext) -> Self {
        Self {
            code: code.into(),
            isolation,
            context,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub fn context(&self) -> &MoveContext {
        &self.context
    }
}

/// Why an execution did not produce a trusted result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Container runtime or base image missing; one pull attempt also failed
    EnvironmentUnavailable,
    /// Environment creation rejected the configuration
    ProvisioningFailed,
    /// Workload failed to launch
    StartFailed,
    /// Exceeded the wall-clock budget and was forcibly stopped
    TimedOut,
    /// Ran to completion with a non-zero exit status
    ExitedNonZero,
    /// Weak-isolation execution raised an error
    RuntimeFault,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::EnvironmentUnavailable => "environment_unavailable",
            Self::ProvisioningFailed => "provisioning_failed",
            Self::StartFailed => "start_failed",
            Self::TimedOut => "timed_out",
            Self::ExitedNonZero => "exited_non_zero",
            Self::RuntimeFault => "runtime_fault",
        };
        write!(f, "{}", s)
    }
}

/// The structured result of one execution. Produced once per submission;
/// success and `failure` are mutually exclusive by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// True only for a clean exit (or a fault-free weak-isolation run)
    pub success: bool,
    /// Combined captured stdout/stderr, or a failure description
    pub output: String,
    /// Process exit code; `None` when the workload never exited on its own
    pub exit_code: Option<i64>,
    /// Failure category; `None` on success
    pub failure: Option<FailureKind>,
    /// Wall-clock time spent on this submission
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl ExecutionOutcome {
    /// A run that exited with status 0.
    pub fn completed(output: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: true,
            output: output.into(),
            exit_code: Some(0),
            failure: None,
            duration,
        }
    }

    /// A run that exited on its own with a non-zero status.
    pub fn exited_non_zero(exit_code: i64, output: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: false,
            output: output.into(),
            exit_code: Some(exit_code),
            failure: Some(FailureKind::ExitedNonZero),
            duration,
        }
    }

    /// A run stopped for exceeding the wall-clock budget. `output` is
    /// whatever was captured before the stop.
    pub fn timed_out(output: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: false,
            output: output.into(),
            exit_code: None,
            failure: Some(FailureKind::TimedOut),
            duration,
        }
    }

    /// A failure before or during launch; `kind` must be one of the setup
    /// categories or `RuntimeFault`.
    pub fn failed(kind: FailureKind, output: impl Into<String>, duration: Duration) -> Self {
        Self {
            success: false,
            output: output.into(),
            exit_code: None,
            failure: Some(kind),
            duration,
        }
    }
}

/// Lifecycle states of one provisioned sandbox environment.
///
/// `Created → Started → (Running | Exited | TimedOut) → Removed`; every
/// handle that reaches `Started` must reach `Removed` on every path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleState {
    Created,
    Started,
    Running,
    Exited,
    TimedOut,
    Removed,
}

/// Identifies one isolated environment. Owned exclusively by the sandbox
/// lifecycle manager for its entire lifetime.
#[derive(Debug, Clone)]
pub struct SandboxHandle {
    id: String,
    name: String,
    state: HandleState,
}

impl SandboxHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: HandleState::Created,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    /// Advance the lifecycle. Transitions out of `Removed` are refused;
    /// removal is terminal.
    pub fn advance(&mut self, state: HandleState) {
        if self.state == HandleState::Removed {
            return;
        }
        self.state = state;
    }

    /// Whether teardown has completed.
    pub fn is_removed(&self) -> bool {
        self.state == HandleState::Removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_is_immutable_snapshot() {
        let ctx = MoveContext::new(vec![vec![0, 1], vec![2, 0]], 2);
        let submission = CodeSubmission::new("next_move = (0, 0)", IsolationLevel::Weak, ctx);
        assert_eq!(submission.code(), "next_move = (0, 0)");
        assert_eq!(submission.isolation(), IsolationLevel::Weak);
        assert_eq!(submission.context().player, 2);
    }

    #[test]
    fn outcomes_are_mutually_exclusive() {
        let ok = ExecutionOutcome::completed("(7, 7)", Duration::from_millis(300));
        assert!(ok.success);
        assert!(ok.failure.is_none());
        assert_eq!(ok.exit_code, Some(0));

        let nonzero = ExecutionOutcome::exited_non_zero(1, "Traceback", Duration::from_millis(200));
        assert!(!nonzero.success);
        assert_eq!(nonzero.failure, Some(FailureKind::ExitedNonZero));

        let timeout = ExecutionOutcome::timed_out("", Duration::from_secs(2));
        assert!(!timeout.success);
        assert_eq!(timeout.exit_code, None);
        assert_eq!(timeout.failure, Some(FailureKind::TimedOut));

        let setup = ExecutionOutcome::failed(
            FailureKind::EnvironmentUnavailable,
            "image pull failed",
            Duration::ZERO,
        );
        assert!(!setup.success);
        assert_eq!(setup.failure, Some(FailureKind::EnvironmentUnavailable));
    }

    #[test]
    fn handle_lifecycle_reaches_removed() {
        let mut handle = SandboxHandle::new("abc123", "gomoku-sandbox-1");
        assert_eq!(handle.state(), HandleState::Created);

        handle.advance(HandleState::Started);
        handle.advance(HandleState::Running);
        handle.advance(HandleState::TimedOut);
        handle.advance(HandleState::Removed);
        assert!(handle.is_removed());

        // Removal is terminal
        handle.advance(HandleState::Running);
        assert!(handle.is_removed());
    }

    #[test]
    fn isolation_level_serialization() {
        assert_eq!(
            serde_json::to_string(&IsolationLevel::Strong).unwrap(),
            "\"strong\""
        );
        let parsed: IsolationLevel = serde_json::from_str("\"weak\"").unwrap();
        assert_eq!(parsed, IsolationLevel::Weak);
    }
}
