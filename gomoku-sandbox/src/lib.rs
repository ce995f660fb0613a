//! Sandboxed execution of untrusted move-picking code.
//!
//! A caller hands over arbitrary Python source that is expected to compute a
//! Gomoku move, and gets back a structured [`ExecutionOutcome`] plus a
//! best-effort [`MoveCandidate`] — bounded in time and resources, with
//! guaranteed cleanup. Two isolation levels are offered:
//!
//! - **Strong** ([`DockerSandbox`]): a per-submission Docker container with
//!   memory/CPU/pid ceilings, no network, read-only root, and the code
//!   mounted read-only. Enforced wall-clock timeout.
//! - **Weak** ([`LocalExecutor`]): an in-process RustPython interpreter with
//!   an explicit allow-list of visible names. No OS-level ceilings and no
//!   timeout of its own — callers choosing this level must wrap it with
//!   their own deadline and accept the host's network reachability.
//!
//! The [`Orchestrator`] routes a [`CodeSubmission`] to the right executor
//! and threads textual output through the shared [`extract`] parser. No
//! failure escapes as an error: every branch folds into the outcome's
//! [`FailureKind`] taxonomy.

#![warn(clippy::all)]

pub mod docker;
pub mod extract;
pub mod local;
pub mod orchestrator;
pub mod policy;
pub mod types;

pub use docker::DockerSandbox;
pub use extract::{extract, MoveCandidate};
pub use local::{LocalExecutor, LocalOutcome, NamespacePolicy};
pub use orchestrator::{ExecutionReport, Orchestrator};
pub use policy::ResourceLimitPolicy;
pub use types::{
    CodeSubmission, ExecutionOutcome, FailureKind, HandleState, IsolationLevel, MoveContext,
    SandboxHandle,
};
