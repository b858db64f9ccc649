//! Backup and restore job runs
//!
//! Backup/restore jobs are created with a backoff limit of zero: a
//! retried attempt would resume against a half-mutated workspace, so
//! exactly one attempt is allowed and any failure is terminal here. A
//! caller that wants a retry recreates the job under a fresh identity.
//!
//! Unlike interactive jobs, cleanup is owned by the caller so the job's
//! logs survive for inspection, bounded by [`BACKUP_CLEANUP_TIMEOUT`]
//! once requested.

use crate::error::{ErrorContext, ProvisionerError};
use crate::jobs::{
    build_job, classify_job, create_or_adopt_job, JobPhase, JOB_POLL_INTERVAL, JOB_START_TIMEOUT,
};
use crate::reconciler::common::is_not_found;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::EnvVar as CoreEnvVar;
use kube::api::{Api, DeleteParams};
use kube::Client;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// One attempt only; a failed backup must never silently rerun.
pub const BACKUP_RESTORE_BACKOFF_LIMIT: i32 = 0;

/// Bound on waiting for a deleted backup job to disappear.
pub const BACKUP_CLEANUP_TIMEOUT: Duration = Duration::from_secs(300);

/// Job name for a backup run. The backup identity, not the installation,
/// keys the name so a caller-driven retry gets a fresh job.
pub fn backup_job_name(backup_id: &str) -> String {
    format!("database-backup-{backup_id}")
}

/// Job name for a restore run.
pub fn restore_job_name(restore_id: &str) -> String {
    format!("database-restore-{restore_id}")
}

/// Builds the one-shot backup job.
pub fn build_backup_job(
    namespace: &str,
    backup_id: &str,
    image: &str,
    env: Vec<CoreEnvVar>,
) -> Job {
    build_job(
        namespace,
        &backup_job_name(backup_id),
        image,
        vec!["meshctl".to_string(), "backup".to_string()],
        env,
        BACKUP_RESTORE_BACKOFF_LIMIT,
    )
}

/// Builds the one-shot restore job.
pub fn build_restore_job(
    namespace: &str,
    restore_id: &str,
    image: &str,
    env: Vec<CoreEnvVar>,
) -> Job {
    build_job(
        namespace,
        &restore_job_name(restore_id),
        image,
        vec!["meshctl".to_string(), "restore".to_string()],
        env,
        BACKUP_RESTORE_BACKOFF_LIMIT,
    )
}

/// Creates the job (adopting an existing one of the same name) and polls
/// briefly to confirm it left the "not yet active" state.
///
/// A job still pending after [`JOB_START_TIMEOUT`] is reported as
/// `Ok(NotStarted)` - a soft failure to be revisited on the next outer
/// scheduling pass rather than blocked on here.
pub async fn trigger_job(
    client: &Client,
    namespace: &str,
    job: &Job,
) -> Result<JobPhase, ProvisionerError> {
    let api: Api<Job> = Api::namespaced(client.clone(), namespace);
    let name = create_or_adopt_job(&api, namespace, job).await?;

    let deadline = Instant::now() + JOB_START_TIMEOUT;
    loop {
        let live = api
            .get(&name)
            .await
            .with_context(|| format!("confirming start of job {namespace}/{name}"))?;
        let phase = classify_job(&live, BACKUP_RESTORE_BACKOFF_LIMIT);
        if phase != JobPhase::NotStarted {
            info!("job {}/{} started ({:?})", namespace, name, phase);
            return Ok(phase);
        }
        if Instant::now() >= deadline {
            warn!(
                "job {}/{} not active after {:?}, deferring to next pass",
                namespace, name, JOB_START_TIMEOUT
            );
            return Ok(JobPhase::NotStarted);
        }
        tokio::time::sleep(JOB_POLL_INTERVAL).await;
    }
}

/// Non-blocking status check for a backup/restore job.
///
/// Returns the current phase, except a job past its backoff limit, which
/// is surfaced as the distinguished [`ProvisionerError::BackoffLimitReached`]
/// sentinel so callers never retry it automatically.
pub async fn check_job(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<JobPhase, ProvisionerError> {
    let api: Api<Job> = Api::namespaced(client.clone(), namespace);
    let job = api
        .get(name)
        .await
        .with_context(|| format!("checking job {namespace}/{name}"))?;

    let backoff_limit = job
        .spec
        .as_ref()
        .and_then(|s| s.backoff_limit)
        .unwrap_or(BACKUP_RESTORE_BACKOFF_LIMIT);
    match classify_job(&job, backoff_limit) {
        JobPhase::BackoffLimitReached => Err(ProvisionerError::BackoffLimitReached(format!(
            "{namespace}/{name}"
        ))),
        phase => Ok(phase),
    }
}

/// Deletes a finished backup/restore job and waits, bounded, for it to
/// disappear. "Not found" at any point is success.
pub async fn cleanup_job(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<(), ProvisionerError> {
    let api: Api<Job> = Api::namespaced(client.clone(), namespace);

    match api.delete(name, &DeleteParams::background()).await {
        Ok(_) => debug!("requested deletion of job {}/{}", namespace, name),
        Err(e) if is_not_found(&e) => return Ok(()),
        Err(e) => return Err(e).with_context(|| format!("deleting job {namespace}/{name}")),
    }

    let deadline = Instant::now() + BACKUP_CLEANUP_TIMEOUT;
    loop {
        match api.get(name).await {
            Ok(_) => {}
            Err(e) if is_not_found(&e) => {
                info!("cleaned up job {}/{}", namespace, name);
                return Ok(());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("confirming deletion of job {namespace}/{name}"));
            }
        }
        if Instant::now() >= deadline {
            return Err(ProvisionerError::Timeout {
                after: BACKUP_CLEANUP_TIMEOUT,
                waiting_for: format!("job {namespace}/{name} to be deleted"),
            });
        }
        tokio::time::sleep(JOB_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_jobs_pin_backoff_limit_to_zero() {
        let job = build_backup_job("ns1", "backup42", "meetmesh/server:6.2.0", vec![]);
        assert_eq!(
            job.spec.as_ref().unwrap().backoff_limit,
            Some(0),
            "one attempt only; retries risk a half-mutated workspace"
        );
        assert_eq!(
            job.metadata.name.as_deref(),
            Some("database-backup-backup42")
        );
    }

    #[test]
    fn restore_jobs_are_named_by_restore_identity() {
        let job = build_restore_job("ns1", "restore7", "meetmesh/server:6.2.0", vec![]);
        assert_eq!(
            job.metadata.name.as_deref(),
            Some("database-restore-restore7")
        );
        let pod = job.spec.unwrap().template.spec.unwrap();
        assert_eq!(
            pod.containers[0].command.as_ref().unwrap()[1],
            "restore"
        );
    }
}
