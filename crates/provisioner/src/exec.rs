//! Interactive command execution against workload pods
//!
//! Streams a command synchronously into the first ready pod of an
//! installation's deployment over the remote-exec protocol. Failures are
//! split into two classes the caller can tell apart: `Setup` (could not
//! reach a pod or establish the stream) and `CommandFailed` (the command
//! ran and exited non-zero).

use crate::error::ProvisionerError;
use crate::reconciler::common::LABEL_APP;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, AttachParams, ListParams};
use kube::Client;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// True for a running pod whose Ready condition is met.
pub(crate) fn is_pod_ready(pod: &Pod) -> bool {
    let Some(status) = pod.status.as_ref() else {
        return false;
    };
    let running = status.phase.as_deref() == Some("Running");
    let ready = status
        .conditions
        .as_ref()
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        });
    running && ready
}

/// Runs `command` inside the installation's first ready pod and returns
/// the combined stdout/stderr output.
pub async fn exec_in_installation(
    client: &Client,
    namespace: &str,
    resource_name: &str,
    command: &[String],
) -> Result<String, ProvisionerError> {
    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);

    let running = pods
        .list(&ListParams::default().labels(&format!("{LABEL_APP}={resource_name}")))
        .await
        .map_err(|e| {
            ProvisionerError::Setup(format!(
                "listing pods for {namespace}/{resource_name}: {e}"
            ))
        })?;

    let pod = running
        .items
        .iter()
        .find(|p| is_pod_ready(p))
        .ok_or_else(|| {
            ProvisionerError::Setup(format!("no ready pod for {namespace}/{resource_name}"))
        })?;
    let pod_name = pod.metadata.name.clone().ok_or_else(|| {
        ProvisionerError::Setup(format!("pod for {namespace}/{resource_name} has no name"))
    })?;
    let container = pod
        .spec
        .as_ref()
        .and_then(|s| s.containers.first())
        .map(|c| c.name.clone())
        .ok_or_else(|| {
            ProvisionerError::Setup(format!("pod {namespace}/{pod_name} has no containers"))
        })?;

    debug!(
        "executing command in {}/{} container {}: {:?}",
        namespace, pod_name, container, command
    );

    let attach = AttachParams::default()
        .container(container)
        .stdout(true)
        .stderr(true);
    let mut attached = pods
        .exec(&pod_name, command.iter().cloned(), &attach)
        .await
        .map_err(|e| {
            ProvisionerError::Setup(format!(
                "establishing exec stream to {namespace}/{pod_name}: {e}"
            ))
        })?;

    let mut output = String::new();
    if let Some(mut stdout) = attached.stdout() {
        stdout.read_to_string(&mut output).await?;
    }
    if let Some(mut stderr) = attached.stderr() {
        stderr.read_to_string(&mut output).await?;
    }

    // The exec protocol reports the command verdict on the status channel
    // after the streams close.
    let status = match attached.take_status() {
        Some(status) => status.await,
        None => None,
    };
    if let Some(status) = status {
        if status.status.as_deref() == Some("Failure") {
            return Err(ProvisionerError::CommandFailed(format!(
                "{}: {}",
                status.message.unwrap_or_else(|| "command failed".to_string()),
                output.trim()
            )));
        }
    }

    info!("executed command in {}/{}", namespace, pod_name);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{PodCondition, PodStatus};

    fn pod(phase: &str, ready: &str) -> Pod {
        Pod {
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                conditions: Some(vec![PodCondition {
                    type_: "Ready".to_string(),
                    status: ready.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn ready_requires_running_phase_and_ready_condition() {
        assert!(is_pod_ready(&pod("Running", "True")));
        assert!(!is_pod_ready(&pod("Running", "False")));
        assert!(!is_pod_ready(&pod("Pending", "True")));
        assert!(!is_pod_ready(&Pod::default()));
    }
}
