//! Integration tests for the Docker sandbox.
//!
//! Requires Docker to be running.
//! Run with: cargo test --test sandbox_integration -- --ignored

use bollard::container::{ListContainersOptions, RemoveContainerOptions};
use bollard::image::RemoveImageOptions;
use bollard::Docker;
use std::collections::HashMap;
use std::time::Duration;
use gomoku_sandbox::{
    extract, CodeSubmission, DockerSandbox, FailureKind, IsolationLevel, MoveContext,
    ResourceLimitPolicy,
};

fn submission(code: &str) -> CodeSubmission {
    CodeSubmission::new(
        code,
        IsolationLevel::Strong,
        MoveContext::new(vec![vec![0; 15]; 15], 2),
    )
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn sandbox_health_check() {
    let sandbox = DockerSandbox::connect().expect("Failed to connect to Docker");
    assert!(sandbox.health_check().await);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn sandbox_runs_move_picker_to_completion() {
    let sandbox = DockerSandbox::connect().unwrap();
    let policy = ResourceLimitPolicy {
        timeout: Duration::from_secs(10),
        ..Default::default()
    };

    let outcome = sandbox
        .run(&submission("print('(7, 7)')"), &policy)
        .await;

    assert!(outcome.success, "expected success, got {:?}", outcome);
    assert_eq!(outcome.exit_code, Some(0));
    assert_eq!(extract(&outcome.output).pair, Some((7, 7)));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn sandbox_captures_stderr() {
    let sandbox = DockerSandbox::connect().unwrap();
    let policy = ResourceLimitPolicy {
        timeout: Duration::from_secs(10),
        ..Default::default()
    };

    let outcome = sandbox
        .run(
            &submission("import sys; sys.stderr.write('error output')"),
            &policy,
        )
        .await;

    assert!(outcome.output.contains("error output"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn sandbox_stops_infinite_loop_within_budget() {
    let sandbox = DockerSandbox::connect().unwrap();
    let policy = ResourceLimitPolicy::default();

    let started = std::time::Instant::now();
    let outcome = sandbox
        .run(&submission("while True:\n    pass"), &policy)
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.failure, Some(FailureKind::TimedOut));
    assert_eq!(outcome.exit_code, None);
    // timeout + grace, with slack for daemon round-trips
    assert!(started.elapsed() < policy.timeout + policy.stop_grace + Duration::from_secs(5));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn sandbox_sleep_past_timeout_is_timed_out() {
    let sandbox = DockerSandbox::connect().unwrap();
    let policy = ResourceLimitPolicy::default();

    let outcome = sandbox
        .run(&submission("import time; time.sleep(30)"), &policy)
        .await;

    assert_eq!(outcome.failure, Some(FailureKind::TimedOut));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn sandbox_reports_non_zero_exit() {
    let sandbox = DockerSandbox::connect().unwrap();
    let policy = ResourceLimitPolicy {
        timeout: Duration::from_secs(10),
        ..Default::default()
    };

    let outcome = sandbox
        .run(&submission("raise ValueError('bad move')"), &policy)
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.failure, Some(FailureKind::ExitedNonZero));
    assert!(outcome.output.contains("ValueError"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn sandbox_network_is_disabled() {
    let sandbox = DockerSandbox::connect().unwrap();
    let policy = ResourceLimitPolicy {
        timeout: Duration::from_secs(15),
        ..Default::default()
    };

    let outcome = sandbox
        .run(
            &submission(
                r#"
import urllib.request
try:
    urllib.request.urlopen('https://example.com', timeout=5)
    print('NETWORK_AVAILABLE')
except Exception as e:
    print('NETWORK_BLOCKED')
"#,
            ),
            &policy,
        )
        .await;

    assert!(
        outcome.output.contains("NETWORK_BLOCKED"),
        "Network should be disabled: {}",
        outcome.output
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn sandbox_respects_memory_limit() {
    let sandbox = DockerSandbox::connect().unwrap();
    let policy = ResourceLimitPolicy {
        memory_limit: 64 * 1024 * 1024,
        memswap_limit: 64 * 1024 * 1024,
        timeout: Duration::from_secs(20),
        ..Default::default()
    };

    let outcome = sandbox
        .run(
            &submission(
                r#"
data = bytearray(100 * 1024 * 1024)
print("should not reach here")
"#,
            ),
            &policy,
        )
        .await;

    assert!(!outcome.success);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn sandbox_root_filesystem_is_read_only() {
    let sandbox = DockerSandbox::connect().unwrap();
    let policy = ResourceLimitPolicy {
        timeout: Duration::from_secs(10),
        ..Default::default()
    };

    let outcome = sandbox
        .run(
            &submission(
                r#"
try:
    with open('/etc/hosts', 'a') as f:
        f.write('x')
    print('ROOT_WRITABLE')
except OSError:
    print('ROOT_READ_ONLY')
# scratch stays writable
with open('/tmp/scratch.txt', 'w') as f:
    f.write('ok')
print('SCRATCH_WRITABLE')
"#,
            ),
            &policy,
        )
        .await;

    assert!(outcome.output.contains("ROOT_READ_ONLY"));
    assert!(outcome.output.contains("SCRATCH_WRITABLE"));
}

/// Containers spawned with `image`, in any state.
async fn containers_using_image(client: &Docker, image: &str) -> Vec<String> {
    let mut filters = HashMap::new();
    filters.insert("ancestor".to_string(), vec![image.to_string()]);
    client
        .list_containers(Some(ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_iter()
        .filter_map(|c| c.id)
        .collect()
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn image_pull_time_is_not_billed_to_the_workload() {
    // A tag no other test uses, so removing it forces a fresh pull here.
    let image = "python:3.9.18-slim";
    let client = Docker::connect_with_local_defaults().unwrap();
    let _ = client
        .remove_image(image, Some(RemoveImageOptions { force: true, ..Default::default() }), None)
        .await;

    let sandbox = DockerSandbox::connect().unwrap();
    let policy = ResourceLimitPolicy {
        image: image.into(),
        ..Default::default()
    };

    // The pull takes far longer than the 2s default budget. The workload
    // itself is instant; only its own runtime counts against the timeout.
    let outcome = sandbox.run(&submission("print('(7, 7)')"), &policy).await;

    assert!(outcome.success, "expected success, got {:?}", outcome);
    assert_ne!(outcome.failure, Some(FailureKind::TimedOut));
    assert_eq!(extract(&outcome.output).pair, Some((7, 7)));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn failed_start_is_reported_and_torn_down() {
    // busybox has no python binary, so create succeeds and start fails.
    let image = "busybox:latest";
    let sandbox = DockerSandbox::connect().unwrap();
    let policy = ResourceLimitPolicy {
        image: image.into(),
        ..Default::default()
    };

    let outcome = sandbox.run(&submission("print('hi')"), &policy).await;

    assert!(!outcome.success);
    assert_eq!(outcome.failure, Some(FailureKind::StartFailed));

    let client = Docker::connect_with_local_defaults().unwrap();
    let leftovers = containers_using_image(&client, image).await;
    assert!(
        leftovers.is_empty(),
        "container must be removed after a failed start: {leftovers:?}"
    );
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn container_lost_mid_poll_is_environment_unavailable() {
    // A tag no other test uses, so the external removal below cannot hit
    // containers belonging to concurrently running tests.
    let image = "python:3.9-slim-bookworm";
    let sandbox = DockerSandbox::connect().unwrap();
    let policy = ResourceLimitPolicy {
        image: image.into(),
        timeout: Duration::from_secs(30),
        ..Default::default()
    };

    let client = Docker::connect_with_local_defaults().unwrap();
    let killer = tokio::spawn(async move {
        // Give the sandbox time to start, then yank the container away.
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let ids = containers_using_image(&client, image).await;
            if ids.is_empty() {
                continue;
            }
            for id in ids {
                let _ = client
                    .remove_container(
                        &id,
                        Some(RemoveContainerOptions { force: true, ..Default::default() }),
                    )
                    .await;
            }
            return;
        }
    });

    let outcome = sandbox
        .run(&submission("import time; time.sleep(25)"), &policy)
        .await;
    killer.await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.failure, Some(FailureKind::EnvironmentUnavailable));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn missing_image_after_failed_pull_is_environment_unavailable() {
    let sandbox = DockerSandbox::connect().unwrap();
    let policy = ResourceLimitPolicy {
        image: "gomoku-no-such-image:does-not-exist".into(),
        ..Default::default()
    };

    let outcome = sandbox.run(&submission("print('hi')"), &policy).await;

    assert!(!outcome.success);
    assert_eq!(
        outcome.failure,
        Some(FailureKind::EnvironmentUnavailable)
    );
}
