//! Shared command context
//!
//! `App` bundles the collaborators every command needs: the control plane,
//! the optional invocation and templating backends, the runtime name
//! directory, the output writer and the cancellation token.

use crate::codec;
use crate::directory::{RuntimeDirectory, RuntimeRef};
use crate::definition::RuntimeDefinition;
use crate::union::Strictness;
use crate::waiter::Waiter;
use acrun_cloud::{
    CURRENT_ENDPOINT_NAME, CloudError, ControlPlane, Endpoint, InvokeApi, RemoteRuntime, Result,
    ResultExt, VersionSummary,
};
use acrun_config::GlobalOptions;
use serde::Serialize;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;

/// Placeholder reported for ids and versions a dry run never learns
pub const KNOWN_AFTER_DEPLOY: &str = "(known after deploy)";

/// Description given to endpoints this tool creates
pub const DEFAULT_ENDPOINT_DESCRIPTION: &str = "Managed by acrun";

/// Evaluates and formats template-language definition files
pub trait TemplateEngine: Send + Sync {
    /// Evaluate a template file to JSON text
    fn evaluate(&self, path: &Path, source: &str) -> Result<String>;

    /// Render a JSON document as template source
    fn format(&self, json: &[u8], filename: &str) -> Result<Vec<u8>>;
}

/// Asks the operator a yes/no question
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

pub struct App {
    plane: Arc<dyn ControlPlane>,
    invoker: Option<Arc<dyn InvokeApi>>,
    template: Option<Arc<dyn TemplateEngine>>,
    confirm: Option<Arc<dyn Confirm>>,
    directory: RuntimeDirectory,
    definition_path: Option<PathBuf>,
    cancel: CancellationToken,
    verbose: bool,
    color: bool,
    output: Mutex<Box<dyn Write + Send>>,
}

impl App {
    pub fn new(plane: Arc<dyn ControlPlane>) -> Self {
        Self {
            plane,
            invoker: None,
            template: None,
            confirm: None,
            directory: RuntimeDirectory::new(),
            definition_path: None,
            cancel: CancellationToken::new(),
            verbose: false,
            color: false,
            output: Mutex::new(Box::new(std::io::stdout())),
        }
    }

    /// Apply the global command line options
    pub fn configure(mut self, options: &GlobalOptions) -> Self {
        self.definition_path = options.agent_runtime.clone();
        self.verbose = options.verbose;
        self.color = options.color;
        self
    }

    pub fn with_directory(mut self, directory: RuntimeDirectory) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_invoker(mut self, invoker: Arc<dyn InvokeApi>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn with_template_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.template = Some(engine);
        self
    }

    pub fn with_confirm(mut self, confirm: Arc<dyn Confirm>) -> Self {
        self.confirm = Some(confirm);
        self
    }

    pub fn with_definition_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.definition_path = Some(path.into());
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_output(mut self, output: Box<dyn Write + Send>) -> Self {
        self.output = Mutex::new(output);
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn plane(&self) -> &dyn ControlPlane {
        self.plane.as_ref()
    }

    pub fn invoker(&self) -> Result<&dyn InvokeApi> {
        self.invoker
            .as_deref()
            .ok_or_else(|| CloudError::Validation("no invocation client configured".to_string()))
    }

    pub fn template_engine(&self) -> Result<&dyn TemplateEngine> {
        self.template
            .as_deref()
            .ok_or_else(|| CloudError::Validation("no template engine configured".to_string()))
    }

    pub fn confirmer(&self) -> Option<&dyn Confirm> {
        self.confirm.as_deref()
    }

    pub fn directory(&self) -> &RuntimeDirectory {
        &self.directory
    }

    pub fn color(&self) -> bool {
        self.color
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// A waiter bound to this app's cancellation token
    pub fn waiter(&self, message: impl Into<String>) -> Waiter {
        Waiter::new(message).cancellation(self.cancel.clone())
    }

    /// Run a remote call, racing it against cancellation
    ///
    /// Failures are wrapped with `operation`.
    pub async fn remote<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CloudError::Cancelled),
            result = call => result.context(operation),
        }
    }

    /// Write to the command output
    pub fn write_output(&self, bytes: &[u8]) -> Result<()> {
        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        output.write_all(bytes)?;
        output.flush()?;
        Ok(())
    }

    /// Log a request payload when verbose output is on
    pub fn dump(&self, label: &str, payload: &impl Serialize) {
        if !self.verbose {
            return;
        }
        match serde_json::to_string_pretty(payload) {
            Ok(json) => tracing::debug!("{}: {}", label, json),
            Err(e) => tracing::debug!(error = %e, "{}: not serializable", label),
        }
    }

    /// Locate the definition file
    pub fn definition_file(&self) -> Result<PathBuf> {
        acrun_config::find_definition_file(self.definition_path.as_deref())
            .map_err(|e| CloudError::Validation(e.to_string()))
    }

    /// Read, decode and validate the local definition file
    pub async fn load_definition(&self) -> Result<RuntimeDefinition> {
        let path = self.definition_file()?;
        tracing::info!(file = %path.display(), "loading agent runtime file");

        let mut bytes = tokio::fs::read(&path)
            .await
            .map_err(CloudError::from)
            .context(format!("read file {}", path.display()))?;
        if path.extension().is_some_and(|ext| ext == "jsonnet") {
            let source = String::from_utf8_lossy(&bytes).into_owned();
            bytes = self
                .template_engine()?
                .evaluate(&path, &source)
                .context("evaluate template")?
                .into_bytes();
        }
        load_definition_bytes(&bytes, &path.display().to_string())
    }

    /// Resolve a runtime name through the directory
    pub async fn resolve_runtime(&self, name: &str) -> Result<RuntimeRef> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CloudError::Cancelled),
            found = self.directory.resolve(self.plane(), name) => found,
        }
    }

    /// Version an endpoint points at: its target version, else its live one
    ///
    /// A missing endpoint and a denied read both come back as NotFound.
    pub async fn endpoint_version(&self, id: &str, endpoint: &str) -> Result<String> {
        let found = match self
            .remote("GetAgentRuntimeEndpoint", self.plane.get_endpoint(id, endpoint))
            .await
        {
            Ok(found) => found,
            Err(e) if e.is_not_found() || e.is_access_denied() => {
                return Err(CloudError::NotFound(format!("endpoint {}", endpoint)));
            }
            Err(e) => return Err(e),
        };
        found
            .current_version()
            .map(str::to_string)
            .ok_or_else(|| CloudError::NotFound(format!("version of endpoint {}", endpoint)))
    }

    /// Turn a qualifier into a literal version
    ///
    /// An unsigned integer is a version already; anything else names an endpoint.
    pub async fn resolve_version(&self, id: &str, qualifier: &str) -> Result<String> {
        if qualifier.parse::<u64>().is_ok() {
            return Ok(qualifier.to_string());
        }
        self.endpoint_version(id, qualifier).await
    }

    /// Remote state of a runtime, qualified by endpoint name or version
    ///
    /// The qualifier defaults to the `current` endpoint.
    pub async fn get_remote(&self, name: &str, qualifier: Option<&str>) -> Result<RemoteRuntime> {
        let runtime = self.resolve_runtime(name).await?;
        let qualifier = endpoint_or_current(qualifier);
        let version = self.resolve_version(&runtime.id, qualifier).await?;
        tracing::debug!(qualifier = %qualifier, version = %version, "resolved qualifier to version");

        self.remote("GetAgentRuntime", self.plane.get_runtime(&runtime.id, &version))
            .await
    }

    /// Every endpoint of a runtime, across pages
    pub async fn list_endpoints(&self, id: &str) -> Result<Vec<Endpoint>> {
        let mut endpoints = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .remote("ListAgentRuntimeEndpoints", self.plane.list_endpoints(id, next_token))
                .await?;
            endpoints.extend(page.items);
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => return Ok(endpoints),
            }
        }
    }

    /// Every version of a runtime, across pages
    pub async fn list_versions(&self, id: &str) -> Result<Vec<VersionSummary>> {
        let mut versions = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .remote(
                    "ListAgentRuntimeVersions",
                    self.plane.list_runtime_versions(id, next_token),
                )
                .await?;
            versions.extend(page.items);
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => return Ok(versions),
            }
        }
    }

    /// The `n` highest versions, newest first
    pub async fn recent_versions(&self, id: &str, n: usize) -> Result<Vec<VersionSummary>> {
        let mut versions = self.list_versions(id).await?;
        versions.sort_by_key(|v| std::cmp::Reverse(v.ordinal()));
        versions.truncate(n);
        Ok(versions)
    }

    /// Log dry-run mode at start, and again when the returned guard drops
    pub fn dry_run_notice(&self, command: &'static str, dry_run: bool) -> Option<DryRunNotice> {
        if !dry_run {
            return None;
        }
        tracing::warn!("starting {} in DRY RUN mode. No changes will be made.", command);
        Some(DryRunNotice { command })
    }
}

pub struct DryRunNotice {
    command: &'static str,
}

impl Drop for DryRunNotice {
    fn drop(&mut self) {
        tracing::warn!("ended {} in DRY RUN mode. No changes were made.", self.command);
    }
}

/// Endpoint name, falling back to `current`
pub fn endpoint_or_current(name: Option<&str>) -> &str {
    match name {
        Some(name) if !name.is_empty() => name,
        _ => CURRENT_ENDPOINT_NAME,
    }
}

/// Decode and validate definition bytes
///
/// Decoding is strict first. An unknown field only warns and the document is
/// decoded again leniently, so files written for a newer schema still load.
pub fn load_definition_bytes(bytes: &[u8], origin: &str) -> Result<RuntimeDefinition> {
    let definition = match codec::decode(bytes, Strictness::Strict) {
        Ok(definition) => definition,
        Err(e) => {
            let Some(field) = e.unknown_field().map(str::to_string) else {
                return Err(e).context("decode agent runtime");
            };
            tracing::warn!(file = %origin, field = %field, "unknown field found in agent runtime file");
            codec::decode(bytes, Strictness::Lenient).context("decode agent runtime")?
        }
    };
    definition.validate()?;
    Ok(definition)
}
