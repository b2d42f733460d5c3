use crate::app::App;
use crate::waiter::{Check, DEFAULT_CHECK_INTERVAL, DEFAULT_MAX_DURATION};
use acrun_cloud::{ActionType, Endpoint, Report, Result, ResultExt, Target, is_reserved_endpoint};
use futures_util::future::join_all;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DeleteOptions {
    pub dry_run: bool,
    /// Skip the confirmation question
    pub force: bool,
    /// How long to wait for each endpoint to disappear
    pub wait_duration: Duration,
    pub polling_interval: Duration,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            force: false,
            wait_duration: DEFAULT_MAX_DURATION,
            polling_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

/// Delete the runtime and every endpoint it has
///
/// Endpoints go first, concurrently; a failing endpoint is logged and does not
/// stop the others or the runtime delete. A runtime that does not exist is
/// not an error.
pub async fn handle(app: &App, options: &DeleteOptions) -> Result<Report> {
    let _notice = app.dry_run_notice("delete", options.dry_run);
    let mut report = Report::new(options.dry_run);

    let definition = app
        .load_definition()
        .await
        .context("load agent runtime file")?;
    let name = definition.name();

    let runtime = match app.resolve_runtime(name).await {
        Ok(runtime) => runtime,
        Err(e) if e.is_not_found() => {
            tracing::info!(name = %name, "agent runtime not found, nothing to delete");
            return Ok(report);
        }
        Err(e) => return Err(e).context("get agent runtime id"),
    };

    if !options.force {
        let prompt = format!(
            "Are you sure you want to delete agent runtime '{}' (ID: {})?",
            name, runtime.id
        );
        let Some(confirm) = app.confirmer() else {
            return Err(acrun_cloud::CloudError::Validation(
                "refusing to delete without confirmation; use force".to_string(),
            ));
        };
        if !confirm.confirm(&prompt) {
            tracing::info!("delete cancelled by user");
            return Ok(report);
        }
    }

    tracing::info!(name = %name, id = %runtime.id, "deleting agent runtime endpoints");
    let endpoints: Vec<Endpoint> = app
        .list_endpoints(&runtime.id)
        .await
        .context("list agent runtime endpoints")?
        .into_iter()
        .filter(|endpoint| {
            if is_reserved_endpoint(&endpoint.name) {
                tracing::info!(id = %endpoint.id, "skipping deletion of DEFAULT endpoint");
                return false;
            }
            true
        })
        .collect();

    let outcomes = join_all(
        endpoints
            .iter()
            .map(|endpoint| delete_endpoint(app, &runtime.id, endpoint, options)),
    )
    .await;
    for (endpoint, removed) in endpoints.iter().zip(outcomes) {
        if removed {
            report.record(ActionType::Delete, Target::Endpoint, &endpoint.name, None);
        }
    }

    tracing::info!(name = %name, id = %runtime.id, "deleting agent runtime");
    app.dump("DeleteAgentRuntimeRequest", &serde_json::json!({ "agentRuntimeId": runtime.id }));
    if options.dry_run {
        tracing::debug!("dry run: delete agent runtime skipped");
        report.record(ActionType::Delete, Target::Runtime, name, None);
        return Ok(report);
    }

    app.remote("DeleteAgentRuntime", app.plane().delete_runtime(&runtime.id))
        .await?;
    app.directory().forget(name).await;
    tracing::info!(name = %name, id = %runtime.id, "deleted agent runtime");
    report.record(ActionType::Delete, Target::Runtime, name, None);
    Ok(report)
}

/// Delete one endpoint and wait until reads report it gone
///
/// Returns whether the endpoint is gone (or would be, under dry-run). Errors
/// are logged here and never propagate.
async fn delete_endpoint(app: &App, id: &str, endpoint: &Endpoint, options: &DeleteOptions) -> bool {
    let name = endpoint.name.as_str();
    tracing::info!(name = %name, id = %endpoint.id, "deleting agent runtime endpoint");
    app.dump(
        "DeleteAgentRuntimeEndpointRequest",
        &serde_json::json!({ "agentRuntimeId": id, "endpointName": name }),
    );
    if options.dry_run {
        tracing::info!(name = %name, id = %endpoint.id, "dry run: delete agent runtime endpoint skipped");
        return true;
    }

    match app
        .remote("DeleteAgentRuntimeEndpoint", app.plane().delete_endpoint(id, name))
        .await
    {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            tracing::info!(name = %name, id = %endpoint.id, "agent runtime endpoint already deleted");
            return true;
        }
        Err(e) => {
            tracing::error!(name = %name, id = %endpoint.id, error = %e, "failed to delete agent runtime endpoint");
            return false;
        }
    }

    let waiter = app
        .waiter("waiting for agent runtime endpoint to be deleted")
        .max_duration(options.wait_duration)
        .check_interval(options.polling_interval)
        .attribute("name", name)
        .attribute("id", &endpoint.id);
    let waited = waiter
        .wait(|| async move {
            match app
                .remote("GetAgentRuntimeEndpoint", app.plane().get_endpoint(id, name))
                .await
            {
                Ok(found) => Ok(Check::pending().with("status", &found.status)),
                Err(e) if e.is_not_found() => Ok(Check::done()),
                Err(e) => Err(e),
            }
        })
        .await;

    match waited {
        Ok(_) => {
            tracing::info!(name = %name, id = %endpoint.id, "agent runtime endpoint deleted");
            true
        }
        Err(e) => {
            tracing::error!(name = %name, id = %endpoint.id, error = %e, "failed to wait for agent runtime endpoint deletion");
            false
        }
    }
}
