use crate::app::{App, endpoint_or_current};
use acrun_cloud::{
    ActionType, CloudError, DEFAULT_ENDPOINT_NAME, EndpointRequest, Report, Result, ResultExt,
    Target, is_reserved_endpoint,
};

#[derive(Debug, Clone, Default)]
pub struct RollbackOptions {
    pub dry_run: bool,
    /// Endpoint to roll back; `current` when unset
    pub endpoint_name: Option<String>,
    /// Version to roll back to; one below the current version when unset
    pub version: Option<String>,
}

/// Point an endpoint back at an earlier version
pub async fn handle(app: &App, options: &RollbackOptions) -> Result<Report> {
    let endpoint = endpoint_or_current(options.endpoint_name.as_deref());
    if is_reserved_endpoint(endpoint) {
        return Err(CloudError::Validation(format!(
            "rollback of the {} endpoint is not allowed",
            DEFAULT_ENDPOINT_NAME
        )));
    }
    let _notice = app.dry_run_notice("rollback", options.dry_run);

    let definition = app
        .load_definition()
        .await
        .context("load agent runtime file")?;
    let runtime = app
        .resolve_runtime(definition.name())
        .await
        .context("get agent runtime id")?;

    let current = app
        .remote(
            "GetAgentRuntimeEndpoint",
            app.plane().get_endpoint(&runtime.id, endpoint),
        )
        .await?;
    let current_version = current.current_version().unwrap_or_default().to_string();

    let target = match &options.version {
        Some(version) => version.clone(),
        None => {
            let target = previous_version(&current_version)?;
            tracing::info!(current = %current_version, target = %target, "automatic rollback");
            target
        }
    };

    let versions = app
        .list_versions(&runtime.id)
        .await
        .context("list agent runtime versions")?;
    if !versions.iter().any(|v| v.version == target) {
        return Err(CloudError::Validation(format!("version {} not found", target)));
    }

    let mut report = Report::new(options.dry_run);
    if current_version == target {
        tracing::info!(endpoint = %endpoint, version = %target, "endpoint is already at the specified version");
        report.record(ActionType::NoOp, Target::Endpoint, endpoint, Some(target));
        return Ok(report);
    }

    tracing::info!(endpoint = %endpoint, from = %current_version, to = %target, "rolling back endpoint");
    let request = EndpointRequest {
        runtime_id: runtime.id.clone(),
        name: endpoint.to_string(),
        version: target.clone(),
        description: current.description.clone(),
    };
    app.dump("UpdateAgentRuntimeEndpointRequest", &request);
    if options.dry_run {
        tracing::debug!("dry run: rollback endpoint skipped");
        report.record(ActionType::Update, Target::Endpoint, endpoint, Some(target));
        return Ok(report);
    }

    app.remote(
        "UpdateAgentRuntimeEndpoint",
        app.plane().update_endpoint(&request),
    )
    .await?;
    tracing::info!(endpoint = %endpoint, version = %target, "rolled back endpoint");
    report.record(ActionType::Update, Target::Endpoint, endpoint, Some(target));
    Ok(report)
}

/// The version label one below `current`
fn previous_version(current: &str) -> Result<String> {
    let current: u64 = current.parse().map_err(|_| {
        CloudError::Validation(format!(
            "failed to parse current version '{}' as integer",
            current
        ))
    })?;
    if current <= 1 {
        return Err(CloudError::Validation(format!(
            "cannot rollback: current version is {} (minimum is 1)",
            current
        )));
    }
    Ok((current - 1).to_string())
}
