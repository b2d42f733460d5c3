use crate::app::App;
use crate::codec;
use acrun_cloud::{Result, ResultExt};
use std::collections::BTreeSet;

/// Recent versions scanned when none is given
pub const DEFAULT_VERSIONS: usize = 5;

#[derive(Debug, Clone)]
pub struct ImagesOptions {
    /// Newest versions to scan besides the endpoints; 0 skips the scan
    pub versions: usize,
}

impl Default for ImagesOptions {
    fn default() -> Self {
        Self {
            versions: DEFAULT_VERSIONS,
        }
    }
}

/// List the container images a runtime still references
///
/// Covers the version behind every endpoint, `DEFAULT` included, and the
/// newest `versions` versions. The sorted URIs are written as a JSON array.
pub async fn handle(app: &App, options: &ImagesOptions) -> Result<Vec<String>> {
    let definition = app
        .load_definition()
        .await
        .context("load agent runtime file")?;
    let name = definition.name();
    tracing::debug!(name = %name, versions = options.versions, "starting images");

    let runtime = app
        .resolve_runtime(name)
        .await
        .context("get agent runtime id")?;

    let mut versions = endpoint_versions(app, &runtime.id).await?;
    if options.versions > 0 {
        let recent = app
            .recent_versions(&runtime.id, options.versions)
            .await
            .context("list agent runtime versions")?;
        tracing::debug!(
            versions = ?recent.iter().map(|v| v.version.as_str()).collect::<Vec<_>>(),
            "recent versions to collect"
        );
        versions.extend(recent.into_iter().map(|v| v.version));
    }

    let mut images = BTreeSet::new();
    for version in &versions {
        match container_uri(app, &runtime.id, version).await {
            Ok(Some(uri)) => {
                images.insert(uri);
            }
            Ok(None) => tracing::debug!(version = %version, "version has no container image"),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                tracing::warn!(version = %version, error = %e, "failed to get container uri for version")
            }
        }
    }

    let images: Vec<String> = images.into_iter().collect();
    let mut output = serde_json::to_vec_pretty(&images)?;
    output.push(b'\n');
    app.write_output(&output)?;
    Ok(images)
}

/// Versions currently served by any endpoint
async fn endpoint_versions(app: &App, id: &str) -> Result<BTreeSet<String>> {
    let endpoints = app
        .list_endpoints(id)
        .await
        .context("list agent runtime endpoints")?;

    let mut versions = BTreeSet::new();
    for endpoint in endpoints {
        // listings do not carry the target version
        let detail = match app
            .remote(
                "GetAgentRuntimeEndpoint",
                app.plane().get_endpoint(id, &endpoint.name),
            )
            .await
        {
            Ok(detail) => detail,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                tracing::warn!(endpoint = %endpoint.name, error = %e, "failed to get endpoint details");
                continue;
            }
        };
        if let Some(version) = detail.current_version() {
            tracing::debug!(endpoint = %endpoint.name, version = %version, "found endpoint");
            versions.insert(version.to_string());
        }
    }
    Ok(versions)
}

async fn container_uri(app: &App, id: &str, version: &str) -> Result<Option<String>> {
    let remote = app
        .remote("GetAgentRuntime", app.plane().get_runtime(id, version))
        .await?;
    let definition = codec::decode_remote(&remote)?;
    Ok(definition.container_uri().map(str::to_string))
}
