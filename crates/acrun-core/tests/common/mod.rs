use acrun_cloud::{
    CloudError, ControlPlane, CreateRuntimeRequest, Endpoint, EndpointRequest, EndpointRevision,
    InvocationHeaders, InvokeApi, InvokeRequest, InvokeResponse, Page, RemoteRuntime, Result,
    RuntimeRevision, RuntimeStatus, RuntimeSummary, UpdateRuntimeRequest, VersionSummary,
};
use acrun_core::{App, Confirm};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const ACCOUNT: &str = "123456789012";

pub fn runtime_arn(id: &str) -> String {
    format!("arn:aws:bedrock-agentcore:us-west-2:{}:runtime/{}", ACCOUNT, id)
}

/// Wire document of a minimal runtime named `name`
pub fn document(name: &str, image_tag: &str) -> Value {
    json!({
        "agentRuntimeName": name,
        "roleArn": format!("arn:aws:iam::{}:role/AgentRole", ACCOUNT),
        "agentRuntimeArtifact": {
            "containerConfiguration": {
                "containerUri": format!("{}.dkr.ecr.us-west-2.amazonaws.com/agent:{}", ACCOUNT, image_tag)
            }
        },
        "networkConfiguration": {"networkMode": "PUBLIC"},
        "protocolConfiguration": {"serverProtocol": "HTTP"},
        "environmentVariables": {"LOG_LEVEL": "info"}
    })
}

struct FakeRuntime {
    id: String,
    name: String,
    /// Wire documents, version `n` at index `n - 1`
    versions: Vec<Value>,
    /// Labels listed instead of `1..=n`
    labels: Option<Vec<String>>,
}

#[derive(Default)]
struct State {
    runtimes: Vec<FakeRuntime>,
    endpoints: Vec<(String, Endpoint)>,
    calls: Vec<String>,
    failing_endpoint_deletes: Vec<String>,
    denied_endpoint_reads: bool,
    status_override: Option<RuntimeStatus>,
    /// Reads of a deleted endpoint that still find it
    lingering_reads: u32,
    lingering: Vec<(String, Endpoint, u32)>,
}

/// In-memory control plane recording every call
///
/// New runtimes get a `DEFAULT` endpoint following the latest version, as
/// the real service does. Listings are paged one item at a time.
#[derive(Default)]
pub struct FakePlane {
    state: Mutex<State>,
}

impl FakePlane {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed a runtime with one version per document; returns its id
    pub fn add_runtime(&self, name: &str, versions: Vec<Value>) -> String {
        let mut state = self.state.lock().unwrap();
        let id = format!("{}-{:04}", name, state.runtimes.len() + 1);
        let latest = versions.len().to_string();
        state.runtimes.push(FakeRuntime {
            id: id.clone(),
            name: name.to_string(),
            versions,
            labels: None,
        });
        state
            .endpoints
            .push((id.clone(), endpoint(&id, "DEFAULT", &latest, None)));
        id
    }

    pub fn add_endpoint(&self, id: &str, name: &str, version: &str, description: Option<&str>) {
        self.state
            .lock()
            .unwrap()
            .endpoints
            .push((id.to_string(), endpoint(id, name, version, description)));
    }

    #[allow(dead_code)]
    pub fn fail_endpoint_delete(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_endpoint_deletes
            .push(name.to_string());
    }

    /// List `labels` as the runtime's versions
    #[allow(dead_code)]
    pub fn set_version_labels(&self, id: &str, labels: &[&str]) {
        let mut state = self.state.lock().unwrap();
        if let Some(runtime) = state.runtimes.iter_mut().find(|r| r.id == id) {
            runtime.labels = Some(labels.iter().map(|l| l.to_string()).collect());
        }
    }

    #[allow(dead_code)]
    pub fn deny_endpoint_reads(&self) {
        self.state.lock().unwrap().denied_endpoint_reads = true;
    }

    #[allow(dead_code)]
    pub fn set_runtime_status(&self, status: RuntimeStatus) {
        self.state.lock().unwrap().status_override = Some(status);
    }

    /// Keep deleted endpoints readable for `reads` more reads each
    #[allow(dead_code)]
    pub fn linger_deleted_endpoints(&self, reads: u32) {
        self.state.lock().unwrap().lingering_reads = reads;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls that change remote state
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("Create") || c.starts_with("Update") || c.starts_with("Delete"))
            .collect()
    }

    #[allow(dead_code)]
    pub fn endpoint(&self, id: &str, name: &str) -> Option<Endpoint> {
        self.state
            .lock()
            .unwrap()
            .endpoints
            .iter()
            .find(|(rid, e)| rid == id && e.name == name)
            .map(|(_, e)| e.clone())
    }

    #[allow(dead_code)]
    pub fn versions(&self, id: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .runtimes
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.versions.clone())
            .unwrap_or_default()
    }

    #[allow(dead_code)]
    pub fn runtime_exists(&self, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .runtimes
            .iter()
            .any(|r| r.name == name)
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn endpoint(id: &str, name: &str, version: &str, description: Option<&str>) -> Endpoint {
    Endpoint {
        id: format!("{}/{}", id, name),
        name: name.to_string(),
        arn: format!("{}/runtime-endpoint/{}", runtime_arn(id), name),
        status: RuntimeStatus::Ready,
        target_version: Some(version.to_string()),
        live_version: Some(version.to_string()),
        description: description.map(str::to_string),
    }
}

fn page<T>(items: Vec<T>, token: Option<String>) -> Page<T> {
    let start: usize = token.and_then(|t| t.parse().ok()).unwrap_or(0);
    let mut items: Vec<T> = items.into_iter().skip(start).collect();
    let next_token = (items.len() > 1).then(|| (start + 1).to_string());
    items.truncate(1);
    Page { items, next_token }
}

fn not_found(what: String) -> CloudError {
    CloudError::NotFound(what)
}

#[async_trait]
impl ControlPlane for FakePlane {
    async fn list_runtimes(&self, next_token: Option<String>) -> Result<Page<RuntimeSummary>> {
        self.record("ListAgentRuntimes".to_string());
        let state = self.state.lock().unwrap();
        let items = state
            .runtimes
            .iter()
            .map(|r| RuntimeSummary {
                id: r.id.clone(),
                arn: runtime_arn(&r.id),
                name: r.name.clone(),
                version: r.versions.len().to_string(),
                status: RuntimeStatus::Ready,
                last_updated_at: None,
            })
            .collect();
        Ok(page(items, next_token))
    }

    async fn get_runtime(&self, id: &str, version: &str) -> Result<RemoteRuntime> {
        self.record(format!("GetAgentRuntime {} {}", id, version));
        let state = self.state.lock().unwrap();
        let runtime = state
            .runtimes
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(format!("runtime {}", id)))?;
        let index: usize = version
            .parse()
            .map_err(|_| CloudError::Validation(format!("bad version {}", version)))?;
        let mut document = runtime
            .versions
            .get(index.wrapping_sub(1))
            .cloned()
            .ok_or_else(|| not_found(format!("runtime {} version {}", id, version)))?;
        // server-side fields the definition does not model
        if let Value::Object(fields) = &mut document {
            fields.insert("agentRuntimeId".to_string(), json!(id));
            fields.insert("agentRuntimeArn".to_string(), json!(runtime_arn(id)));
            fields.insert("agentRuntimeVersion".to_string(), json!(version));
            fields.insert("status".to_string(), json!("READY"));
        }
        Ok(RemoteRuntime {
            id: id.to_string(),
            arn: runtime_arn(id),
            name: runtime.name.clone(),
            version: version.to_string(),
            status: state.status_override.clone().unwrap_or(RuntimeStatus::Ready),
            document,
            created_at: None,
            last_updated_at: None,
        })
    }

    async fn create_runtime(&self, request: &CreateRuntimeRequest) -> Result<RuntimeRevision> {
        let name = request.document["agentRuntimeName"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        self.record(format!("CreateAgentRuntime {}", name));
        let id = self.add_runtime(&name, vec![request.document.clone()]);
        Ok(RuntimeRevision {
            arn: runtime_arn(&id),
            id,
            version: "1".to_string(),
            workload_identity_arn: None,
        })
    }

    async fn update_runtime(&self, request: &UpdateRuntimeRequest) -> Result<RuntimeRevision> {
        self.record(format!("UpdateAgentRuntime {}", request.runtime_id));
        let mut state = self.state.lock().unwrap();
        let runtime = state
            .runtimes
            .iter_mut()
            .find(|r| r.id == request.runtime_id)
            .ok_or_else(|| not_found(format!("runtime {}", request.runtime_id)))?;
        runtime.versions.push(request.document.clone());
        let version = runtime.versions.len().to_string();
        for (rid, e) in state.endpoints.iter_mut() {
            if *rid == request.runtime_id && e.name == "DEFAULT" {
                e.target_version = Some(version.clone());
                e.live_version = Some(version.clone());
            }
        }
        Ok(RuntimeRevision {
            id: request.runtime_id.clone(),
            arn: runtime_arn(&request.runtime_id),
            version,
            workload_identity_arn: None,
        })
    }

    async fn delete_runtime(&self, id: &str) -> Result<()> {
        self.record(format!("DeleteAgentRuntime {}", id));
        let mut state = self.state.lock().unwrap();
        let before = state.runtimes.len();
        state.runtimes.retain(|r| r.id != id);
        if state.runtimes.len() == before {
            return Err(not_found(format!("runtime {}", id)));
        }
        state.endpoints.retain(|(rid, _)| rid != id);
        Ok(())
    }

    async fn list_runtime_versions(
        &self,
        id: &str,
        next_token: Option<String>,
    ) -> Result<Page<VersionSummary>> {
        self.record(format!("ListAgentRuntimeVersions {}", id));
        let state = self.state.lock().unwrap();
        let runtime = state
            .runtimes
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(format!("runtime {}", id)))?;
        let labels = runtime
            .labels
            .clone()
            .unwrap_or_else(|| (1..=runtime.versions.len()).map(|n| n.to_string()).collect());
        let items = labels
            .into_iter()
            .map(|version| VersionSummary {
                version,
                status: RuntimeStatus::Ready,
                last_updated_at: None,
            })
            .collect();
        Ok(page(items, next_token))
    }

    async fn list_endpoints(&self, id: &str, next_token: Option<String>) -> Result<Page<Endpoint>> {
        self.record(format!("ListAgentRuntimeEndpoints {}", id));
        let state = self.state.lock().unwrap();
        let items = state
            .endpoints
            .iter()
            .filter(|(rid, _)| rid == id)
            .map(|(_, e)| e.clone())
            .collect();
        Ok(page(items, next_token))
    }

    async fn get_endpoint(&self, id: &str, name: &str) -> Result<Endpoint> {
        self.record(format!("GetAgentRuntimeEndpoint {}", name));
        let mut state = self.state.lock().unwrap();
        if state.denied_endpoint_reads {
            return Err(CloudError::AccessDenied(format!("endpoint {}", name)));
        }
        if let Some((_, e, remaining)) = state
            .lingering
            .iter_mut()
            .find(|(rid, e, remaining)| rid == id && e.name == name && *remaining > 0)
        {
            *remaining -= 1;
            let mut e = e.clone();
            e.status = RuntimeStatus::Deleting;
            return Ok(e);
        }
        state
            .endpoints
            .iter()
            .find(|(rid, e)| rid == id && e.name == name)
            .map(|(_, e)| e.clone())
            .ok_or_else(|| not_found(format!("endpoint {}", name)))
    }

    async fn create_endpoint(&self, request: &EndpointRequest) -> Result<EndpointRevision> {
        self.record(format!(
            "CreateAgentRuntimeEndpoint {} {}",
            request.name, request.version
        ));
        let created = endpoint(
            &request.runtime_id,
            &request.name,
            &request.version,
            request.description.as_deref(),
        );
        let revision = EndpointRevision {
            arn: created.arn.clone(),
            status: RuntimeStatus::Ready,
            target_version: created.target_version.clone(),
        };
        self.state
            .lock()
            .unwrap()
            .endpoints
            .push((request.runtime_id.clone(), created));
        Ok(revision)
    }

    async fn update_endpoint(&self, request: &EndpointRequest) -> Result<EndpointRevision> {
        self.record(format!(
            "UpdateAgentRuntimeEndpoint {} {}",
            request.name, request.version
        ));
        let mut state = self.state.lock().unwrap();
        let (_, found) = state
            .endpoints
            .iter_mut()
            .find(|(rid, e)| *rid == request.runtime_id && e.name == request.name)
            .ok_or_else(|| not_found(format!("endpoint {}", request.name)))?;
        found.target_version = Some(request.version.clone());
        found.live_version = Some(request.version.clone());
        if request.description.is_some() {
            found.description = request.description.clone();
        }
        Ok(EndpointRevision {
            arn: found.arn.clone(),
            status: RuntimeStatus::Ready,
            target_version: found.target_version.clone(),
        })
    }

    async fn delete_endpoint(&self, id: &str, name: &str) -> Result<()> {
        self.record(format!("DeleteAgentRuntimeEndpoint {}", name));
        let mut state = self.state.lock().unwrap();
        if state.failing_endpoint_deletes.iter().any(|n| n == name) {
            return Err(CloudError::Remote(format!("endpoint {} is busy", name)));
        }
        let position = state
            .endpoints
            .iter()
            .position(|(rid, e)| rid == id && e.name == name)
            .ok_or_else(|| not_found(format!("endpoint {}", name)))?;
        let (rid, removed) = state.endpoints.remove(position);
        let reads = state.lingering_reads;
        if reads > 0 {
            state.lingering.push((rid, removed, reads));
        }
        Ok(())
    }
}

/// Invocation fake answering every request with a fixed body
pub struct FakeInvoker {
    body: Vec<u8>,
    pub last: Mutex<Option<InvokeRequest>>,
}

impl FakeInvoker {
    #[allow(dead_code)]
    pub fn new(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: body.as_bytes().to_vec(),
            last: Mutex::new(None),
        })
    }
}

#[async_trait]
impl InvokeApi for FakeInvoker {
    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse> {
        let headers = InvocationHeaders {
            trace_id: request.headers.trace_id.clone(),
            runtime_session_id: Some("session-1".to_string()),
            ..Default::default()
        };
        *self.last.lock().unwrap() = Some(request);
        Ok(InvokeResponse {
            status_code: 200,
            content_type: Some("application/json".to_string()),
            headers,
            body: Box::new(std::io::Cursor::new(self.body.clone())),
        })
    }
}

/// Fixed answer to every confirmation question
pub struct Answer(pub bool);

impl Confirm for Answer {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Output writer whose contents tests can read back
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub struct TestProject {
    pub root: TempDir,
    pub output: SharedBuffer,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self {
            root,
            output: SharedBuffer::default(),
        }
    }

    pub fn write_definition(&self, document: &Value) -> PathBuf {
        let path = self.root.path().join("agent_runtime.json");
        std::fs::write(&path, serde_json::to_vec_pretty(document).unwrap()).unwrap();
        path
    }

    #[allow(dead_code)]
    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// App over `plane` reading this project's definition file
    pub fn app(&self, plane: Arc<FakePlane>) -> App {
        App::new(plane)
            .with_definition_path(self.root.path().join("agent_runtime.json"))
            .with_output(Box::new(self.output.clone()))
    }
}
