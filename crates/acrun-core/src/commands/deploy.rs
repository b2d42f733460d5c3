use crate::app::{App, DEFAULT_ENDPOINT_DESCRIPTION, KNOWN_AFTER_DEPLOY, endpoint_or_current};
use crate::codec;
use crate::definition::RuntimeDefinition;
use crate::waiter::{Check, DEFAULT_CHECK_INTERVAL, DEFAULT_MAX_DURATION};
use acrun_cloud::{
    ActionType, CloudError, CreateRuntimeRequest, DEFAULT_ENDPOINT_NAME, EndpointRequest,
    RemoteRuntime, Report, Result, ResultExt, Target, UpdateRuntimeRequest, is_reserved_endpoint,
};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub dry_run: bool,
    /// Endpoint to publish; `current` when unset
    pub endpoint_name: Option<String>,
    /// How long to wait for the new version to become ready
    pub wait_duration: Duration,
    pub polling_interval: Duration,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            endpoint_name: None,
            wait_duration: DEFAULT_MAX_DURATION,
            polling_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

/// Create or update the runtime, wait for it, then point the endpoint at it
pub async fn handle(app: &App, options: &DeployOptions) -> Result<Report> {
    let endpoint = endpoint_or_current(options.endpoint_name.as_deref());
    if is_reserved_endpoint(endpoint) {
        return Err(CloudError::Validation(format!(
            "deploying to the {} endpoint is not allowed",
            DEFAULT_ENDPOINT_NAME
        )));
    }
    let _notice = app.dry_run_notice("deploy", options.dry_run);

    let definition = app
        .load_definition()
        .await
        .context("load agent runtime file")?;
    let name = definition.name();
    let mut report = Report::new(options.dry_run);

    let (id, version) = match app.resolve_runtime(name).await {
        Ok(found) => {
            let version = update_runtime(app, &definition, endpoint, options, &mut report)
                .await
                .context("update agent runtime")?;
            (found.id, version)
        }
        Err(e) if e.is_not_found() => create_runtime(app, &definition, options, &mut report)
            .await
            .context("create agent runtime")?,
        Err(e) => return Err(e).context("get agent runtime id by name"),
    };

    wait_ready(app, &id, &version, options)
        .await
        .context("wait for agent runtime ready")?;
    tracing::info!(name = %name, id = %id, version = %version, "deployed agent runtime");

    publish_endpoint(app, &id, endpoint, &version, options, &mut report)
        .await
        .context("publish endpoint")?;

    tracing::info!(summary = %report.summary(), "deploy finished");
    Ok(report)
}

async fn create_runtime(
    app: &App,
    definition: &RuntimeDefinition,
    options: &DeployOptions,
    report: &mut Report,
) -> Result<(String, String)> {
    let name = definition.name();
    tracing::info!(name = %name, "creating agent runtime");

    let request = CreateRuntimeRequest {
        document: codec::encode_value(definition)?,
    };
    app.dump("CreateAgentRuntimeRequest", &request);
    if options.dry_run {
        tracing::debug!("dry run: create agent runtime skipped");
        report.record(ActionType::Create, Target::Runtime, name, None);
        return Ok((KNOWN_AFTER_DEPLOY.to_string(), KNOWN_AFTER_DEPLOY.to_string()));
    }

    let created = app
        .remote("CreateAgentRuntime", app.plane().create_runtime(&request))
        .await?;
    tracing::debug!(
        arn = %created.arn,
        id = %created.id,
        version = %created.version,
        workload_identity_arn = created.workload_identity_arn.as_deref().unwrap_or_default(),
        "created agent runtime"
    );
    report.record(
        ActionType::Create,
        Target::Runtime,
        name,
        Some(created.version.clone()),
    );
    Ok((created.id, created.version))
}

async fn update_runtime(
    app: &App,
    definition: &RuntimeDefinition,
    endpoint: &str,
    options: &DeployOptions,
    report: &mut Report,
) -> Result<String> {
    let name = definition.name();
    let remote = match app.get_remote(name, Some(endpoint)).await {
        Ok(remote) => remote,
        Err(e) if e.is_not_found() => app
            .get_remote(name, Some(DEFAULT_ENDPOINT_NAME))
            .await
            .context(format!("get remote agent runtime (endpoint={})", DEFAULT_ENDPOINT_NAME))?,
        Err(e) => {
            return Err(e).context(format!("get remote agent runtime (endpoint={})", endpoint));
        }
    };
    tracing::info!(name = %name, arn = %remote.arn, "updating agent runtime");

    let request = update_request(&remote, definition)?;
    app.dump("UpdateAgentRuntimeRequest", &request);
    if options.dry_run {
        tracing::debug!("dry run: update agent runtime skipped");
        report.record(ActionType::Update, Target::Runtime, name, None);
        return Ok(KNOWN_AFTER_DEPLOY.to_string());
    }

    let updated = app
        .remote("UpdateAgentRuntime", app.plane().update_runtime(&request))
        .await?;
    tracing::debug!(
        arn = %updated.arn,
        id = %updated.id,
        version = %updated.version,
        workload_identity_arn = updated.workload_identity_arn.as_deref().unwrap_or_default(),
        "updated agent runtime"
    );
    report.record(
        ActionType::Update,
        Target::Runtime,
        name,
        Some(updated.version.clone()),
    );
    Ok(updated.version)
}

/// Declared document plus the identifier only the remote state knows
pub fn update_request(
    remote: &RemoteRuntime,
    definition: &RuntimeDefinition,
) -> Result<UpdateRuntimeRequest> {
    Ok(UpdateRuntimeRequest {
        runtime_id: remote.id.clone(),
        document: codec::encode_value(definition)?,
    })
}

async fn wait_ready(app: &App, id: &str, version: &str, options: &DeployOptions) -> Result<()> {
    if options.dry_run {
        tracing::debug!("dry run: wait for agent runtime to be ready skipped");
        return Ok(());
    }
    tracing::info!(id = %id, version = %version, "waiting for agent runtime to be ready");

    let waiter = app
        .waiter("agent runtime is not ready yet")
        .max_duration(options.wait_duration)
        .check_interval(options.polling_interval)
        .attribute("id", id)
        .attribute("version", version);

    waiter
        .wait(|| async move {
            let runtime = app
                .remote("GetAgentRuntime", app.plane().get_runtime(id, version))
                .await?;
            if runtime.status.is_ready() {
                return Ok(Check::done());
            }
            if runtime.status.is_failed() {
                return Err(CloudError::Remote(format!(
                    "agent runtime {} version {} is {}",
                    id, version, runtime.status
                )));
            }
            Ok(Check::pending().with("status", &runtime.status))
        })
        .await?;

    tracing::info!(id = %id, version = %version, "agent runtime is ready");
    Ok(())
}

async fn publish_endpoint(
    app: &App,
    id: &str,
    endpoint: &str,
    version: &str,
    options: &DeployOptions,
    report: &mut Report,
) -> Result<()> {
    // a runtime that was only pretend-created cannot have endpoints
    let existing = if id == KNOWN_AFTER_DEPLOY {
        None
    } else {
        match app
            .remote("GetAgentRuntimeEndpoint", app.plane().get_endpoint(id, endpoint))
            .await
        {
            Ok(found) => Some(found),
            Err(e) if e.is_not_found() || e.is_access_denied() => None,
            Err(e) => return Err(e),
        }
    };

    let (action, description) = match &existing {
        None => (ActionType::Create, DEFAULT_ENDPOINT_DESCRIPTION.to_string()),
        Some(found) => (
            ActionType::Update,
            found
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT_DESCRIPTION.to_string()),
        ),
    };
    let request = EndpointRequest {
        runtime_id: id.to_string(),
        name: endpoint.to_string(),
        version: version.to_string(),
        description: Some(description),
    };

    tracing::info!(name = %endpoint, version = %version, "{} agent runtime endpoint", verb(action));
    app.dump("AgentRuntimeEndpointRequest", &request);
    if options.dry_run {
        tracing::debug!("dry run: {} agent runtime endpoint skipped", action);
        report.record(action, Target::Endpoint, endpoint, None);
        return Ok(());
    }

    let revision = match action {
        ActionType::Create => {
            app.remote("CreateAgentRuntimeEndpoint", app.plane().create_endpoint(&request))
                .await?
        }
        _ => {
            app.remote("UpdateAgentRuntimeEndpoint", app.plane().update_endpoint(&request))
                .await?
        }
    };
    tracing::debug!(name = %endpoint, arn = %revision.arn, "{} agent runtime endpoint", past(action));
    report.record(action, Target::Endpoint, endpoint, Some(version.to_string()));
    Ok(())
}

fn verb(action: ActionType) -> &'static str {
    match action {
        ActionType::Create => "creating",
        _ => "updating",
    }
}

fn past(action: ActionType) -> &'static str {
    match action {
        ActionType::Create => "created",
        _ => "updated",
    }
}
