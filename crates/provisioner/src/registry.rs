//! Versioned client registry
//!
//! Lazily builds and caches one API client handle per cluster. A handle
//! that was involved in any failed operation is evicted so the next use
//! rebuilds it from freshly exported credentials; this covers handles
//! that silently went stale (rotated credentials, recreated cluster)
//! without active health-checking.
//!
//! The cache is shared process-wide across installations on the same
//! cluster. Lookups for different clusters never block each other, and
//! two concurrent cache misses for the same cluster single-flight: the
//! first caller builds, the second waits and reuses.

use crate::access::ClusterAccess;
use crate::error::ProvisionerError;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A cached, ready-to-use client bound to one cluster.
pub struct ClusterHandle {
    /// API client for the cluster
    pub client: Client,
    /// The exported kubeconfig backing the client
    pub kubeconfig: PathBuf,
}

impl std::fmt::Debug for ClusterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterHandle")
            .field("kubeconfig", &self.kubeconfig)
            .finish_non_exhaustive()
    }
}

// One slot per cluster key. The outer map lock is held only long enough
// to fetch or insert the slot Arc; building happens under the slot's own
// lock so a slow export for one cluster never stalls lookups for another.
type Slot = Arc<Mutex<Option<Arc<ClusterHandle>>>>;

/// Process-wide cache of per-cluster client handles.
pub struct ClientRegistry {
    access: Arc<dyn ClusterAccess>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry").finish_non_exhaustive()
    }
}

impl ClientRegistry {
    /// Creates an empty registry backed by the given access provider.
    pub fn new(access: Arc<dyn ClusterAccess>) -> Self {
        Self {
            access,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached handle for `cluster_name`, building one on a
    /// miss. Build failures are returned uncached; retries belong to the
    /// caller.
    pub async fn get(&self, cluster_name: &str) -> Result<Arc<ClusterHandle>, ProvisionerError> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(cluster_name.to_string()).or_default().clone()
        };

        let mut guard = slot.lock().await;
        if let Some(handle) = guard.as_ref() {
            debug!("reusing cached client handle for cluster {}", cluster_name);
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(self.build(cluster_name).await?);
        *guard = Some(Arc::clone(&handle));
        info!("built client handle for cluster {}", cluster_name);
        Ok(handle)
    }

    async fn build(&self, cluster_name: &str) -> Result<ClusterHandle, ProvisionerError> {
        let path = self.access.export_access(cluster_name).await?;
        let kubeconfig = Kubeconfig::read_from(&path).map_err(|e| {
            ProvisionerError::Setup(format!(
                "reading exported kubeconfig for cluster {cluster_name}: {e}"
            ))
        })?;
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                ProvisionerError::Setup(format!(
                    "loading client config for cluster {cluster_name}: {e}"
                ))
            })?;
        let client = Client::try_from(config).map_err(|e| {
            ProvisionerError::Setup(format!(
                "constructing API client for cluster {cluster_name}: {e}"
            ))
        })?;
        Ok(ClusterHandle {
            client,
            kubeconfig: path,
        })
    }

    /// Evicts the cached handle for `cluster_name` if `error` is set; a
    /// `None` error is a no-op. Every call site that used a handle must
    /// route its result through here with the same key.
    pub async fn invalidate_on_error(
        &self,
        error: Option<&ProvisionerError>,
        cluster_name: &str,
    ) {
        let Some(error) = error else { return };

        let removed = self.slots.lock().await.remove(cluster_name);
        if let Some(slot) = removed {
            warn!(
                "evicting client handle for cluster {} after error: {}",
                cluster_name, error
            );
            Self::close(slot).await;
        }
    }

    /// Evicts and closes every cached handle. Used at process shutdown.
    pub async fn teardown(&self) {
        let slots: Vec<(String, Slot)> = self.slots.lock().await.drain().collect();
        for (cluster_name, slot) in slots {
            debug!("closing client handle for cluster {}", cluster_name);
            Self::close(slot).await;
        }
    }

    // In-flight holders keep their Arc until drop; closing here only
    // removes the exported kubeconfig so the next build re-exports.
    async fn close(slot: Slot) {
        if let Some(handle) = slot.lock().await.take() {
            let _ = tokio::fs::remove_file(&handle.kubeconfig).await;
        }
    }
}
