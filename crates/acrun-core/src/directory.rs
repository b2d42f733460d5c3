//! Runtime name directory
//!
//! The control plane addresses runtimes by id while definitions name them.
//! Resolved names are kept for the life of the directory; a miss lists every
//! runtime under the write lock.

use acrun_cloud::{CloudError, ControlPlane, Result, ResultExt};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeRef {
    pub id: String,
    pub arn: String,
}

#[derive(Debug, Default)]
pub struct RuntimeDirectory {
    entries: RwLock<HashMap<String, RuntimeRef>>,
}

impl RuntimeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a runtime name, listing runtimes on a miss
    ///
    /// Only found names are remembered: a name that is missing now is listed
    /// again on the next call.
    pub async fn resolve(&self, plane: &dyn ControlPlane, name: &str) -> Result<RuntimeRef> {
        if let Some(found) = self.entries.read().await.get(name) {
            return Ok(found.clone());
        }

        let mut entries = self.entries.write().await;
        // another task may have listed while this one waited for the lock
        if let Some(found) = entries.get(name) {
            return Ok(found.clone());
        }

        tracing::debug!(name = %name, "listing runtimes");
        let mut next_token = None;
        loop {
            let page = plane
                .list_runtimes(next_token)
                .await
                .context("ListAgentRuntimes")?;
            if let Some(summary) = page.items.into_iter().find(|s| s.name == name) {
                let found = RuntimeRef {
                    id: summary.id,
                    arn: summary.arn,
                };
                entries.insert(name.to_string(), found.clone());
                return Ok(found);
            }
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Err(CloudError::NotFound(format!("agent runtime {}", name)))
    }

    /// Drop a name, e.g. after the runtime was deleted
    pub async fn forget(&self, name: &str) {
        self.entries.write().await.remove(name);
    }

    /// Number of remembered names
    pub async fn cached(&self) -> usize {
        self.entries.read().await.len()
    }
}
