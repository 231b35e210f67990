// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build job orchestration: one job from image pull to parsed result.

use crate::build_logs::BuildLogs;
use crate::cancel::CancelToken;
use crate::container::{BuildContainer, ContainerSettings, RepositoryMount, RESULTS_DIRECTORY};
use crate::error::BuildJobError;
use crate::stager::{LookupTarget, RepositoryStager, StagedRepository, StagerConfig};
use lci_adapters::{ContainerAdapter, ContainerError, GitAdapter};
use lci_core::{
    format_duration, BuildJobId, BuildJobQueueItem, BuildResult, Clock, IdGen, RepositoryUri,
};
use lci_reports::{parse_results_archive, ParsedResults};
use std::fmt;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Deadline for jobs whose build config sets none
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(120);

/// Where a job is in its build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Queued,
    PullingImage,
    StagingRepos,
    ConfiguringContainer,
    RunningScript,
    ExtractingResults,
    Parsing,
    Cleanup,
    Done,
    Failed,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobPhase::Queued => "queued",
            JobPhase::PullingImage => "pulling_image",
            JobPhase::StagingRepos => "staging_repos",
            JobPhase::ConfiguringContainer => "configuring_container",
            JobPhase::RunningScript => "running_script",
            JobPhase::ExtractingResults => "extracting_results",
            JobPhase::Parsing => "parsing",
            JobPhase::Cleanup => "cleanup",
            JobPhase::Done => "done",
            JobPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Adapter dependencies of the executor
pub struct ExecutorDeps<A, G, C, I> {
    pub containers: A,
    pub git: G,
    pub clock: C,
    pub ids: I,
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub stager: StagerConfig,
    pub container: ContainerSettings,
    pub default_timeout: Duration,
}

impl ExecutorConfig {
    pub fn new(checked_out_repos_path: impl Into<PathBuf>) -> Self {
        Self {
            stager: StagerConfig::new(checked_out_repos_path),
            container: ContainerSettings::default(),
            default_timeout: DEFAULT_JOB_TIMEOUT,
        }
    }
}

/// Runs build jobs. Shared by all jobs of an agent.
pub struct BuildJobExecutor<A, G, C, I> {
    container: BuildContainer<A>,
    stager: RepositoryStager<G, I>,
    logs: BuildLogs,
    clock: C,
    default_timeout: Duration,
}

/// Per-run bookkeeping; whatever is recorded here is cleaned up.
struct JobRun<'a> {
    job: &'a BuildJobQueueItem,
    container_name: &'a str,
    phase: JobPhase,
    repos: Vec<StagedRepository>,
    container_id: Option<String>,
}

impl JobRun<'_> {
    fn enter(&mut self, phase: JobPhase) {
        tracing::info!(from = %self.phase, to = %phase, "phase");
        self.phase = phase;
    }
}

fn banner(text: impl fmt::Display) -> String {
    format!("~~~~~~~~~~~~~~~~~~~~ {} ~~~~~~~~~~~~~~~~~~~~", text)
}

impl<A, G, C, I> BuildJobExecutor<A, G, C, I>
where
    A: ContainerAdapter,
    G: GitAdapter,
    C: Clock,
    I: IdGen,
{
    pub fn new(deps: ExecutorDeps<A, G, C, I>, config: ExecutorConfig) -> Self {
        let logs = BuildLogs::new(deps.clock.clone());
        Self {
            container: BuildContainer::new(deps.containers, logs.clone(), config.container),
            stager: RepositoryStager::new(deps.git, deps.ids, logs.clone(), config.stager),
            logs,
            clock: deps.clock,
            default_timeout: config.default_timeout,
        }
    }

    pub fn logs(&self) -> &BuildLogs {
        &self.logs
    }

    pub fn container(&self) -> &BuildContainer<A> {
        &self.container
    }

    pub fn stager(&self) -> &RepositoryStager<G, I> {
        &self.stager
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Deadline for `job`
    pub fn timeout_for(&self, job: &BuildJobQueueItem) -> Duration {
        job.build_config
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
    }

    /// Build `job` in a container named `container_name`.
    ///
    /// Races the build against `cancel` and the job deadline. Clones and
    /// the container are cleaned up on every outcome before this returns.
    pub async fn run(
        &self,
        job: &BuildJobQueueItem,
        container_name: &str,
        cancel: &CancelToken,
    ) -> Result<BuildResult, BuildJobError> {
        let span = tracing::info_span!("build_job", job_id = %job.id, container = container_name);
        self.run_inner(job, container_name, cancel)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        job: &BuildJobQueueItem,
        container_name: &str,
        cancel: &CancelToken,
    ) -> Result<BuildResult, BuildJobError> {
        let started = Instant::now();
        let timeout = self.timeout_for(job);
        let mut run = JobRun {
            job,
            container_name,
            phase: JobPhase::Queued,
            repos: Vec::new(),
            container_id: None,
        };

        let outcome = tokio::select! {
            result = self.build(&mut run) => result,
            () = cancel.cancelled() => Err(BuildJobError::Cancelled(job.id.clone())),
            () = tokio::time::sleep(timeout) => Err(BuildJobError::TimedOut {
                id: job.id.clone(),
                secs: timeout.as_secs(),
            }),
        };

        if let Err(e @ (BuildJobError::Cancelled(_) | BuildJobError::TimedOut { .. })) = &outcome {
            tracing::warn!(phase = %run.phase, error = %e, "build interrupted");
            self.logs.append(&job.id, e.to_string());
            self.force_stop(&run).await;
        }

        run.enter(JobPhase::Cleanup);
        self.cleanup(&run).await;

        match &outcome {
            Ok(result) => {
                let message = format!(
                    "Building and testing submission for repository {} and commit hash {} took {} for build job {}",
                    job.repository_info.assignment_repository_uri.slug(),
                    result.assignment_commit_hash.as_deref().unwrap_or("unknown"),
                    format_duration(started.elapsed()),
                    job.id
                );
                tracing::info!(successful = result.successful, "{}", message);
                self.logs.append(&job.id, message);
                run.enter(JobPhase::Done);
            }
            Err(e) => {
                tracing::error!(error = %e, "build job failed");
                run.enter(JobPhase::Failed);
            }
        }
        outcome
    }

    async fn build(&self, run: &mut JobRun<'_>) -> Result<BuildResult, BuildJobError> {
        let job = run.job;
        let id = &job.id;
        let config = &job.build_config;
        let repos = &job.repository_info;
        let name = run.container_name;

        self.logs.append(id, banner(format_args!("Start Build Job {}", id)));

        run.enter(JobPhase::PullingImage);
        if let Err(source) = self.container.pull_image(&config.docker_image).await {
            let message = format!("Could not pull Docker image {}", config.docker_image);
            self.logs.append(id, message.as_str());
            return Err(BuildJobError::ImagePull { message, source });
        }

        run.enter(JobPhase::StagingRepos);
        let assignment_hash = match &config.assignment_commit_hash {
            Some(hash) => Some(hash.clone()),
            None => {
                self.stager
                    .last_commit_hash(
                        id,
                        &repos.assignment_repository_uri,
                        &config.branch,
                        LookupTarget::Assignment,
                    )
                    .await?
            }
        };
        let test_hash = match &config.test_commit_hash {
            Some(hash) => Some(hash.clone()),
            None => {
                self.stager
                    .last_commit_hash(id, &repos.test_repository_uri, &config.branch, LookupTarget::Test)
                    .await?
            }
        };

        // A push to the tests or an auxiliary repository carries a hash of
        // that repository, so the assignment stays at its branch head.
        let checkout_assignment = config.assignment_commit_hash.is_some()
            && repos.triggered_by_push_to.pins_assignment_commit();
        let hash = assignment_hash.as_deref();
        let assignment = self
            .stage(run, &repos.assignment_repository_uri, hash, checkout_assignment)
            .await?;
        let tests = self.stage(run, &repos.test_repository_uri, hash, false).await?;
        let solution = match &repos.solution_repository_uri {
            Some(_) if repos.solution_is_assignment() => Some(assignment.clone()),
            Some(uri) => Some(self.stage(run, uri, hash, false).await?),
            None => None,
        };
        let mut auxiliaries = Vec::new();
        for (uri, directory) in repos.auxiliary_repositories() {
            let path = self.stage(run, uri, hash, false).await?;
            auxiliaries.push(RepositoryMount::new(path, directory));
        }

        run.enter(JobPhase::ConfiguringContainer);
        let container_id = self
            .container
            .configure(name, config)
            .await
            .map_err(|e| self.container_failure(id, format!("Could not create container {}", name), e))?;
        run.container_id = Some(container_id.clone());
        self.container
            .start(&container_id)
            .await
            .map_err(|e| self.container_failure(id, format!("Could not start container {}", name), e))?;
        self.logs.append(
            id,
            banner(format_args!("Started container {} for build job {}", name, id)),
        );

        self.logs.append(
            id,
            banner("Populating build job container with repositories and build script"),
        );
        let paths = config.checkout_paths();
        let mut mounts = vec![
            RepositoryMount::new(tests, paths.test),
            RepositoryMount::new(assignment, paths.assignment),
        ];
        if let Some(solution) = solution {
            mounts.push(RepositoryMount::new(solution, paths.solution));
        }
        mounts.extend(auxiliaries);
        self.container
            .populate(&container_id, &mounts)
            .await
            .map_err(|e| {
                self.container_failure(id, format!("Could not populate container {}", name), e)
            })?;

        run.enter(JobPhase::RunningScript);
        self.logs.append(
            id,
            banner(format_args!("Executing Build Script for Build job {}", id)),
        );
        self.container
            .run_script(&container_id, id, config.network_disabled())
            .await
            .map_err(|e| self.logged(id, e))?;
        self.logs.append(
            id,
            banner(format_args!("Finished Executing Build Script for Build job {}", id)),
        );
        let completed_at = self.clock.now();

        run.enter(JobPhase::ExtractingResults);
        self.logs.append(
            id,
            banner(format_args!(
                "Moving test results to specified directory for build job {}",
                id
            )),
        );
        self.container
            .move_results(&container_id, &config.result_paths, RESULTS_DIRECTORY)
            .await
            .map_err(|e| self.logged(id, e))?;

        self.logs.append(
            id,
            banner(format_args!(
                "Collecting test results from container {} for build job {}",
                container_id, id
            )),
        );
        let archive = match self.container.extract_results(&container_id).await {
            Ok(archive) => archive,
            Err(ContainerError::NotFound(cause)) => {
                let message = format!("Could not find test results in container {}", name);
                tracing::error!(%cause, "{}", message);
                self.logs.append(id, message);
                return Ok(BuildResult::failed(
                    config.branch.clone(),
                    assignment_hash,
                    test_hash,
                    completed_at,
                    self.logs.get(id),
                ));
            }
            Err(e) => {
                return Err(self.container_failure(
                    id,
                    format!("Could not collect test results from container {}", name),
                    e,
                ))
            }
        };

        run.enter(JobPhase::Parsing);
        let parsed = self.parse(id, archive).await.map_err(|source| {
            let message = "Error while parsing test results".to_string();
            self.logs.append(id, message.as_str());
            BuildJobError::ResultArchive { message, source }
        })?;

        Ok(BuildResult::new(
            config.branch.clone(),
            assignment_hash,
            test_hash,
            completed_at,
            vec![parsed.tests],
            parsed.static_code_analysis_reports,
            self.logs.get(id),
        ))
    }

    async fn stage(
        &self,
        run: &mut JobRun<'_>,
        uri: &RepositoryUri,
        commit_hash: Option<&str>,
        checkout: bool,
    ) -> Result<PathBuf, BuildJobError> {
        let repo = self
            .stager
            .clone(&run.job.id, uri, &run.job.build_config.branch, commit_hash, checkout)
            .await?;
        let path = repo.path.clone();
        run.repos.push(repo);
        Ok(path)
    }

    async fn parse(&self, id: &BuildJobId, archive: Vec<u8>) -> std::io::Result<ParsedResults> {
        let logs = self.logs.clone();
        let id = id.clone();
        tokio::task::spawn_blocking(move || {
            parse_results_archive(Cursor::new(archive), |line| logs.append(&id, line))
        })
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?
    }

    fn container_failure(
        &self,
        id: &BuildJobId,
        message: String,
        source: ContainerError,
    ) -> BuildJobError {
        self.logged(id, BuildJobError::container(message, source))
    }

    fn logged(&self, id: &BuildJobId, error: BuildJobError) -> BuildJobError {
        self.logs.append(id, error.to_string());
        error
    }

    /// Kill path for builds that were cancelled or ran out of time
    async fn force_stop(&self, run: &JobRun<'_>) {
        let id = match &run.container_id {
            Some(id) => Some(id.clone()),
            None => match self.container.adapter().inspect(run.container_name).await {
                Ok(info) => info.map(|i| i.id),
                Err(e) => {
                    tracing::warn!(error = %e, "could not look up container");
                    None
                }
            },
        };
        if let Some(id) = id {
            self.container.stop_unresponsive(&id).await;
        }
    }

    async fn cleanup(&self, run: &JobRun<'_>) {
        let id = &run.job.id;
        self.container.stop(run.container_name).await;
        for repo in &run.repos {
            self.stager.delete(id, repo);
        }
        self.stager
            .delete_scratch_dirs(id, run.repos.iter().map(|r| r.scratch_dir.as_path()));
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
