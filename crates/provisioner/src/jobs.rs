//! Ephemeral one-shot Jobs
//!
//! Builds short-lived batch workloads, polls them to completion on a
//! bounded interval, and guarantees cleanup on every exit path. The five
//! way status classification is shared with the backup/restore runner.

use crate::error::{ErrorContext, ProvisionerError};
use crate::reconciler::common::{is_already_exists, is_not_found, LABEL_APP};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar as CoreEnvVar, PodSpec, PodTemplateSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Fixed interval between job status polls.
pub const JOB_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Bound on waiting for an interactive job to complete.
pub const JOB_WAIT_TIMEOUT: Duration = Duration::from_secs(600);

/// Bound on confirming a job has started at all.
pub const JOB_START_TIMEOUT: Duration = Duration::from_secs(5);

/// TTL after completion; the cluster garbage-collects the object if the
/// owner never does.
pub const JOB_TTL_SECONDS: i32 = 3600;

/// Where a one-shot job stands, read from its status counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    /// At least one pod succeeded
    Complete,
    /// A pod is currently running
    Running,
    /// No pod has run yet
    NotStarted,
    /// Failed attempts remain within the backoff limit; the job
    /// controller will retry
    AwaitingRetry,
    /// Failures exceeded the backoff limit; terminal
    BackoffLimitReached,
}

/// Classifies a job against its backoff limit.
///
/// Success dominates: a job with any succeeded pod is `Complete`
/// regardless of earlier failures.
pub fn classify_job(job: &Job, backoff_limit: i32) -> JobPhase {
    let status = job.status.as_ref();
    let succeeded = status.and_then(|s| s.succeeded).unwrap_or(0);
    let active = status.and_then(|s| s.active).unwrap_or(0);
    let failed = status.and_then(|s| s.failed).unwrap_or(0);

    if succeeded > 0 {
        JobPhase::Complete
    } else if active > 0 {
        JobPhase::Running
    } else if failed == 0 {
        JobPhase::NotStarted
    } else if failed <= backoff_limit {
        JobPhase::AwaitingRetry
    } else {
        JobPhase::BackoffLimitReached
    }
}

/// Builds a single-container, no-restart job with a completion TTL.
pub fn build_job(
    namespace: &str,
    name: &str,
    image: &str,
    command: Vec<String>,
    env: Vec<CoreEnvVar>,
    backoff_limit: i32,
) -> Job {
    let mut labels = BTreeMap::new();
    labels.insert(LABEL_APP.to_string(), name.to_string());

    Job {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(backoff_limit),
            ttl_seconds_after_finished: Some(JOB_TTL_SECONDS),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: name.to_string(),
                        image: Some(image.to_string()),
                        command: Some(command),
                        env: if env.is_empty() { None } else { Some(env) },
                        ..Default::default()
                    }],
                    restart_policy: Some("Never".to_string()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

/// Creates a job, adopting an already-existing one of the same name.
pub(crate) async fn create_or_adopt_job(
    api: &Api<Job>,
    namespace: &str,
    job: &Job,
) -> Result<String, ProvisionerError> {
    let name = job
        .metadata
        .name
        .clone()
        .ok_or_else(|| ProvisionerError::InvalidConfig("job is missing a name".to_string()))?;

    match api.create(&PostParams::default(), job).await {
        Ok(_) => info!("created job {}/{}", namespace, name),
        Err(e) if is_already_exists(&e) => {
            debug!("job {}/{} already exists, adopting it", namespace, name);
        }
        Err(e) => return Err(e).with_context(|| format!("creating job {namespace}/{name}")),
    }
    Ok(name)
}

/// Polls until the job reports at least one succeeded pod, or the bound
/// expires with a wrapped timeout error.
pub(crate) async fn wait_for_job_completion(
    api: &Api<Job>,
    namespace: &str,
    name: &str,
    timeout: Duration,
) -> Result<(), ProvisionerError> {
    let deadline = Instant::now() + timeout;
    loop {
        let job = api
            .get(name)
            .await
            .with_context(|| format!("polling job {namespace}/{name}"))?;
        let backoff_limit = job
            .spec
            .as_ref()
            .and_then(|s| s.backoff_limit)
            .unwrap_or(0);
        match classify_job(&job, backoff_limit) {
            JobPhase::Complete => return Ok(()),
            JobPhase::BackoffLimitReached => {
                return Err(ProvisionerError::BackoffLimitReached(format!(
                    "{namespace}/{name}"
                )));
            }
            _ => {}
        }

        if Instant::now() >= deadline {
            return Err(ProvisionerError::Timeout {
                after: timeout,
                waiting_for: format!("job {namespace}/{name} to complete"),
            });
        }
        tokio::time::sleep(JOB_POLL_INTERVAL).await;
    }
}

/// Runs a one-shot job to completion and deletes it afterwards, on every
/// exit path, so no ephemeral workload outlives its caller.
pub async fn run_job_to_completion(
    client: &Client,
    namespace: &str,
    job: &Job,
    timeout: Duration,
) -> Result<(), ProvisionerError> {
    let api: Api<Job> = Api::namespaced(client.clone(), namespace);
    let name = create_or_adopt_job(&api, namespace, job).await?;

    let result = wait_for_job_completion(&api, namespace, &name, timeout).await;

    // Cleanup fires regardless of how the wait ended; a cleanup failure
    // is logged rather than masking the wait's own verdict.
    match api.delete(&name, &DeleteParams::background()).await {
        Ok(_) => debug!("cleaned up job {}/{}", namespace, name),
        Err(e) if is_not_found(&e) => {}
        Err(e) => warn!("failed to clean up job {}/{}: {}", namespace, name, e),
    }

    result
}

/// Builds and runs an administrative command job against an
/// installation's image, bounded by [`JOB_WAIT_TIMEOUT`].
pub async fn run_command_job(
    client: &Client,
    namespace: &str,
    resource_name: &str,
    image: &str,
    command: Vec<String>,
) -> Result<(), ProvisionerError> {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let name = format!("{resource_name}-exec-{}", &suffix[..8]);
    let job = build_job(namespace, &name, image, command, vec![], 0);
    run_job_to_completion(client, namespace, &job, JOB_WAIT_TIMEOUT).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::batch::v1::JobStatus;

    fn job_with_status(succeeded: i32, active: i32, failed: i32) -> Job {
        Job {
            status: Some(JobStatus {
                succeeded: Some(succeeded),
                active: Some(active),
                failed: Some(failed),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn zero_backoff_failure_is_terminal() {
        let job = job_with_status(0, 0, 1);
        assert_eq!(classify_job(&job, 0), JobPhase::BackoffLimitReached);
    }

    #[test]
    fn active_job_is_running() {
        let job = job_with_status(0, 1, 0);
        assert_eq!(classify_job(&job, 0), JobPhase::Running);
    }

    #[test]
    fn success_dominates_failed_count() {
        let job = job_with_status(1, 0, 2);
        assert_eq!(classify_job(&job, 0), JobPhase::Complete);
    }

    #[test]
    fn untouched_job_is_not_started() {
        let job = job_with_status(0, 0, 0);
        assert_eq!(classify_job(&job, 0), JobPhase::NotStarted);
        assert_eq!(classify_job(&Job::default(), 0), JobPhase::NotStarted);
    }

    #[test]
    fn failures_within_limit_await_retry() {
        let job = job_with_status(0, 0, 2);
        assert_eq!(classify_job(&job, 3), JobPhase::AwaitingRetry);
        assert_eq!(classify_job(&job, 1), JobPhase::BackoffLimitReached);
    }

    #[test]
    fn built_job_is_one_shot() {
        let job = build_job(
            "ns1",
            "mm-w3c9-exec-1a2b3c4d",
            "meetmesh/server:6.2.0",
            vec!["meshctl".to_string(), "version".to_string()],
            vec![],
            0,
        );
        let spec = job.spec.unwrap();
        assert_eq!(spec.backoff_limit, Some(0));
        assert_eq!(spec.ttl_seconds_after_finished, Some(JOB_TTL_SECONDS));
        let pod = spec.template.spec.unwrap();
        assert_eq!(pod.restart_policy.as_deref(), Some("Never"));
        assert_eq!(pod.containers.len(), 1);
        assert!(pod.containers[0].env.is_none());
    }
}
