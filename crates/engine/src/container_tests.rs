// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use lci_adapters::{ContainerCall, FakeContainerAdapter};
use lci_core::test_support::build_config;
use lci_core::{DockerRunConfig, FakeClock};
use yare::parameterized;

fn build_container(fake: &FakeContainerAdapter) -> (BuildContainer<FakeContainerAdapter>, BuildLogs) {
    let logs = BuildLogs::new(FakeClock::default());
    (
        BuildContainer::new(fake.clone(), logs.clone(), ContainerSettings::default()),
        logs,
    )
}

async fn running_container(container: &BuildContainer<FakeContainerAdapter>) -> String {
    let id = container
        .configure("lci-agent-1-job-1", &build_config())
        .await
        .unwrap();
    container.start(&id).await.unwrap();
    id
}

#[parameterized(
    glob = { "build/test-results/**/*.xml" },
    plain = { "target/surefire-reports/TEST-Foo.xml" },
    dashes_and_underscores = { "test_reports/my-suite.xml" },
)]
fn result_path_accepted(path: &str) {
    assert!(check_result_path(path).is_ok());
}

#[parameterized(
    traversal = { "../../etc/passwd" },
    hidden_traversal = { "build/../../root" },
    command_separator = { "out;rm -rf /" },
    substitution = { "$(id)" },
    whitespace = { "a b" },
    empty = { "" },
)]
fn result_path_rejected(path: &str) {
    assert!(matches!(
        check_result_path(path),
        Err(BuildJobError::InvalidResultPath(p)) if p == path
    ));
}

fn settings(max_cpus: u32, max_memory_mb: u64) -> ContainerSettings {
    ContainerSettings {
        max_cpus,
        max_memory_mb,
        max_memory_swap_mb: 0,
        default_limits: ResourceLimits {
            cpus: Some(1),
            memory_mb: Some(512),
            memory_swap_mb: None,
        },
        proxy: None,
    }
}

fn requesting(cpus: Option<u32>, memory: Option<u64>, swap: Option<u64>) -> BuildConfig {
    let mut config = build_config();
    config.docker_run_config = Some(DockerRunConfig {
        cpu_count: cpus,
        memory_mb: memory,
        memory_swap_mb: swap,
        ..DockerRunConfig::default()
    });
    config
}

#[parameterized(
    capped_by_max = { requesting(Some(8), Some(4096), None), settings(4, 2048), Some(4), Some(2048), None },
    below_max = { requesting(Some(2), Some(1024), None), settings(4, 2048), Some(2), Some(1024), None },
    unbounded = { requesting(Some(8), Some(8192), Some(9000)), settings(0, 0), Some(8), Some(8192), Some(9000) },
    partial_request_uses_defaults = { requesting(Some(2), None, None), settings(4, 2048), Some(2), Some(512), None },
    zero_is_unrequested = { requesting(Some(0), Some(0), Some(0)), settings(4, 2048), Some(1), Some(512), None },
)]
fn limits_are_clamped(
    config: BuildConfig,
    settings: ContainerSettings,
    cpus: Option<u32>,
    memory_mb: Option<u64>,
    memory_swap_mb: Option<u64>,
) {
    assert_eq!(
        settings.limits_for(&config),
        ResourceLimits {
            cpus,
            memory_mb,
            memory_swap_mb
        }
    );
}

#[test]
fn limits_without_run_config_are_defaults() {
    let s = settings(4, 2048);
    assert_eq!(s.limits_for(&build_config()), s.default_limits);
}

#[tokio::test]
async fn configure_builds_sentinel_container() {
    let fake = FakeContainerAdapter::new();
    let logs = BuildLogs::new(FakeClock::default());
    let container = BuildContainer::new(
        fake.clone(),
        logs,
        ContainerSettings {
            proxy: Some(ProxySettings {
                http_proxy: "http://proxy:3128".into(),
                https_proxy: "http://proxy:3128".into(),
                no_proxy: "localhost".into(),
            }),
            ..ContainerSettings::default()
        },
    );
    let mut config = build_config();
    config.docker_run_config = Some(DockerRunConfig {
        env: [("JAVA_OPTS".to_string(), "-Xmx1g".to_string())].into(),
        ..DockerRunConfig::default()
    });

    container.configure("lci-a-job-1", &config).await.unwrap();

    let created = fake.container_by_name("lci-a-job-1").unwrap();
    let keys: Vec<&str> = created.spec.env.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["HTTP_PROXY", "HTTPS_PROXY", "NO_PROXY", "SCRIPT", "JAVA_OPTS"]);
    assert_eq!(created.spec.env[3].1, config.build_script);
    assert_eq!(created.spec.image, config.docker_image);
    assert!(created.spec.entrypoint.join(" ").contains(STOP_SENTINEL));
    assert!(created.spec.auto_remove);
    assert!(!created.running);
}

#[tokio::test]
async fn pull_skips_present_images() {
    let fake = FakeContainerAdapter::new();
    fake.add_image("alpine:3");
    let (container, _) = build_container(&fake);

    container.pull_image("alpine:3").await.unwrap();
    container.pull_image("maven:3").await.unwrap();

    let pulls: Vec<ContainerCall> = fake
        .calls()
        .into_iter()
        .filter(|c| matches!(c, ContainerCall::PullImage { .. }))
        .collect();
    assert_eq!(
        pulls,
        vec![ContainerCall::PullImage {
            image: "maven:3".into()
        }]
    );
}

#[tokio::test]
async fn populate_copies_repositories_to_checkout_paths() {
    let dir = tempfile::tempdir().unwrap();
    for slug in ["prog-tests", "prog-student1"] {
        std::fs::create_dir_all(dir.path().join(slug)).unwrap();
        std::fs::write(dir.path().join(slug).join("README.md"), slug).unwrap();
    }
    let fake = FakeContainerAdapter::new();
    let (container, _) = build_container(&fake);
    let id = running_container(&container).await;

    container
        .populate(
            &id,
            &[
                RepositoryMount::new(dir.path().join("prog-tests"), ""),
                RepositoryMount::new(dir.path().join("prog-student1"), "assignment"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(
        fake.executed_commands(),
        vec![
            "mkdir -p /var/tmp/testing-dir".to_string(),
            "chmod -R 777 /var/tmp/testing-dir".to_string(),
            "mkdir -p /var/tmp/testing-dir".to_string(),
            "cp -r /var/tmp/prog-tests/. /var/tmp/testing-dir".to_string(),
            "mkdir -p /var/tmp/testing-dir/assignment".to_string(),
            "cp -r /var/tmp/prog-student1/. /var/tmp/testing-dir/assignment".to_string(),
            "bash -c echo \"$SCRIPT\" > /var/tmp/script.sh".to_string(),
            "bash -c chmod +x /var/tmp/script.sh".to_string(),
        ]
    );
    let uploads = fake.container_by_name("lci-agent-1-job-1").unwrap().uploads;
    assert_eq!(uploads.len(), 2);
    assert!(uploads.iter().all(|(dest, _)| dest == WORKING_DIRECTORY));

    let all_root = fake.calls().into_iter().all(|c| match c {
        ContainerCall::Exec { request, .. } => request.user.as_deref() == Some("root"),
        _ => true,
    });
    assert!(all_root, "setup runs as root");
}

#[tokio::test]
async fn populate_fails_when_setup_command_fails() {
    let fake = FakeContainerAdapter::new();
    fake.fail_command("chmod -R");
    let (container, _) = build_container(&fake);
    let id = running_container(&container).await;

    let err = container.populate(&id, &[]).await.unwrap_err();

    assert!(matches!(err, ContainerError::CommandFailed(msg) if msg.contains("chmod -R 777")));
}

#[tokio::test]
async fn run_script_streams_output_into_build_log() {
    let fake = FakeContainerAdapter::new();
    fake.set_script_output(
        vec!["> Task :test".into(), "".into(), "BUILD SUCCESSFUL".into()],
        3,
    );
    let (container, logs) = build_container(&fake);
    let id = running_container(&container).await;
    let job = BuildJobId::new("job-1");

    let exit_code = container.run_script(&id, &job, false).await.unwrap();

    assert_eq!(exit_code, 3);
    let lines: Vec<String> = logs.get(&job).into_iter().map(|e| e.log).collect();
    assert_eq!(lines, vec!["> Task :test", "BUILD SUCCESSFUL"]);
    let script_call = fake.calls().into_iter().find_map(|c| match c {
        ContainerCall::ExecStreaming { request, .. } => Some(request),
        _ => None,
    });
    let request = script_call.unwrap();
    assert_eq!(request.cmd, vec!["bash", SCRIPT_PATH]);
    assert_eq!(request.user, None, "script runs as the default user");
    assert!(!fake
        .calls()
        .iter()
        .any(|c| matches!(c, ContainerCall::DisconnectNetwork { .. })));
}

#[tokio::test]
async fn run_script_disconnects_network_when_disabled() {
    let fake = FakeContainerAdapter::new();
    let (container, _) = build_container(&fake);
    let id = running_container(&container).await;

    container
        .run_script(&id, &BuildJobId::new("job-1"), true)
        .await
        .unwrap();

    assert!(fake.calls().contains(&ContainerCall::DisconnectNetwork {
        id: id.clone(),
        network: "bridge".into()
    }));
}

#[tokio::test]
async fn move_results_validates_every_path_first() {
    let fake = FakeContainerAdapter::new();
    let (container, _) = build_container(&fake);
    let id = running_container(&container).await;

    let err = container
        .move_results(
            &id,
            &["build/*.xml".to_string(), "../secret".to_string()],
            RESULTS_DIRECTORY,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BuildJobError::InvalidResultPath(_)));
    assert!(fake.executed_commands().is_empty());
}

#[tokio::test]
async fn move_results_tolerates_unmatched_globs() {
    let fake = FakeContainerAdapter::new();
    fake.fail_command("mv build");
    let (container, _) = build_container(&fake);
    let id = running_container(&container).await;

    container
        .move_results(
            &id,
            &["build/**/*.xml".to_string(), "target/*.xml".to_string()],
            RESULTS_DIRECTORY,
        )
        .await
        .unwrap();

    assert_eq!(
        fake.executed_commands(),
        vec![
            "bash -c shopt -s globstar && mkdir -p /var/tmp/results",
            "bash -c shopt -s globstar && mv build/**/*.xml /var/tmp/results",
            "bash -c shopt -s globstar && mv target/*.xml /var/tmp/results",
        ]
    );
}

#[tokio::test]
async fn extract_results_reports_missing_directory() {
    let fake = FakeContainerAdapter::new();
    let (container, _) = build_container(&fake);
    let id = running_container(&container).await;

    let err = container.extract_results(&id).await.unwrap_err();
    assert!(matches!(err, ContainerError::NotFound(_)));

    fake.set_archive(RESULTS_DIRECTORY, vec![1, 2, 3]);
    assert_eq!(container.extract_results(&id).await.unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn stop_touches_sentinel_of_running_container() {
    let fake = FakeContainerAdapter::new();
    let (container, _) = build_container(&fake);
    running_container(&container).await;

    container.stop("lci-agent-1-job-1").await;

    assert_eq!(fake.executed_commands(), vec![format!("touch {}", STOP_SENTINEL)]);
    assert!(fake.live_containers().is_empty(), "container removed itself");
}

#[tokio::test]
async fn stop_is_noop_for_absent_or_stopped_containers() {
    let fake = FakeContainerAdapter::new();
    let (container, _) = build_container(&fake);
    container
        .configure("lci-created-only", &build_config())
        .await
        .unwrap();

    container.stop("lci-missing").await;
    container.stop("lci-created-only").await;

    assert!(fake.executed_commands().is_empty());
}

#[tokio::test]
async fn stop_unresponsive_uses_engine_stop() {
    let fake = FakeContainerAdapter::new();
    let (container, _) = build_container(&fake);
    let id = running_container(&container).await;

    container.stop_unresponsive(&id).await;

    assert!(fake.calls().contains(&ContainerCall::Stop {
        id: id.clone(),
        grace: Duration::from_secs(15)
    }));
    assert!(fake.live_containers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_unresponsive_kills_after_stop_deadline() {
    let fake = FakeContainerAdapter::new();
    fake.hang_stop();
    let (container, _) = build_container(&fake);
    let id = running_container(&container).await;

    container.stop_unresponsive(&id).await;

    assert!(fake.calls().contains(&ContainerCall::Kill { id: id.clone() }));
    assert!(!fake.container_by_name("lci-agent-1-job-1").unwrap().running);
}

#[tokio::test]
async fn stop_unresponsive_removes_vanished_container() {
    let fake = FakeContainerAdapter::new();
    fake.set_stop_error(ContainerError::NotFound("No such container".into()));
    let (container, _) = build_container(&fake);
    let id = running_container(&container).await;

    container.stop_unresponsive(&id).await;

    assert!(fake.calls().contains(&ContainerCall::Remove { id: id.clone() }));
    assert!(!fake.calls().iter().any(|c| matches!(c, ContainerCall::Kill { .. })));
}

#[tokio::test]
async fn stop_unresponsive_kills_on_other_stop_errors() {
    let fake = FakeContainerAdapter::new();
    fake.set_stop_error(ContainerError::CommandFailed("daemon busy".into()));
    let (container, _) = build_container(&fake);
    let id = running_container(&container).await;

    container.stop_unresponsive(&id).await;

    assert!(fake.calls().contains(&ContainerCall::Kill { id }));
}

#[tokio::test]
async fn cleanup_stale_containers_only_touches_prefix() {
    let fake = FakeContainerAdapter::new();
    fake.add_running_container("lci-agent-1-old-job", "alpine");
    fake.add_running_container("lci-agent-2-their-job", "alpine");
    let (container, _) = build_container(&fake);

    let found = container.cleanup_stale_containers("lci-agent-1-").await.unwrap();

    assert_eq!(found, 1);
    let live: Vec<String> = fake.live_containers().into_iter().map(|c| c.spec.name).collect();
    assert_eq!(live, vec!["lci-agent-2-their-job"]);
}
