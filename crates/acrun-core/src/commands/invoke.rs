use crate::app::{App, endpoint_or_current};
use acrun_cloud::{InvocationHeaders, InvokeRequest, Result, ResultExt};
use tokio::io::AsyncReadExt;

const JSON_CONTENT_TYPE: &str = "application/json";
const TEXT_CONTENT_TYPE: &str = "text/plain";

#[derive(Debug, Clone, Default)]
pub struct InvokeOptions {
    /// Request body; read from stdin when unset
    pub payload: Option<String>,
    /// Derived from the payload when unset
    pub content_type: Option<String>,
    pub accept: Option<String>,
    /// Endpoint to invoke; `current` when unset
    pub endpoint_name: Option<String>,
    pub headers: InvocationHeaders,
}

/// Invoke the deployed runtime and copy the response body to the output
pub async fn handle(app: &App, options: &InvokeOptions) -> Result<()> {
    let definition = app
        .load_definition()
        .await
        .context("load agent runtime file")?;
    let name = definition.name();
    let runtime = app
        .resolve_runtime(name)
        .await
        .context("get agent runtime ARN by name")?;
    let invoker = app.invoker()?;
    tracing::info!(name = %name, arn = %runtime.arn, "invoking agent runtime");

    let payload = match &options.payload {
        Some(payload) => payload.clone().into_bytes(),
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .map_err(acrun_cloud::CloudError::from)
                .context("read payload")?;
            buf
        }
    };

    let request = InvokeRequest {
        runtime_arn: runtime.arn,
        qualifier: endpoint_or_current(options.endpoint_name.as_deref()).to_string(),
        content_type: options
            .content_type
            .clone()
            .unwrap_or_else(|| content_type_for(&payload).to_string()),
        accept: options
            .accept
            .clone()
            .unwrap_or_else(|| JSON_CONTENT_TYPE.to_string()),
        headers: options.headers.clone(),
        payload,
    };
    let mut response = app
        .remote("InvokeAgentRuntime", invoker.invoke(request))
        .await?;

    let echoed = response
        .headers
        .present()
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ");
    tracing::info!(
        status_code = response.status_code,
        content_type = response.content_type.as_deref().unwrap_or_default(),
        headers = %echoed,
        "invoke agent runtime success"
    );

    let mut chunk = vec![0u8; 8192];
    loop {
        let n = tokio::select! {
            biased;
            _ = app.cancellation_token().cancelled() => return Err(acrun_cloud::CloudError::Cancelled),
            read = response.body.read(&mut chunk) => read?,
        };
        if n == 0 {
            return Ok(());
        }
        app.write_output(&chunk[..n])?;
    }
}

fn content_type_for(payload: &[u8]) -> &'static str {
    if serde_json::from_slice::<serde::de::IgnoredAny>(payload).is_ok() {
        JSON_CONTENT_TYPE
    } else {
        TEXT_CONTENT_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(br#"{"prompt": "hi"}"#), "application/json");
        assert_eq!(content_type_for(b"[1, 2]"), "application/json");
        assert_eq!(content_type_for(b"hello"), "text/plain");
        assert_eq!(content_type_for(b""), "text/plain");
    }
}
