use super::{OutputFormat, format_document};
use crate::app::App;
use crate::codec;
use acrun_cloud::{DEFAULT_ENDPOINT_NAME, Result, ResultExt};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Name of the existing runtime
    pub name: String,
    /// Endpoint name or version to read; `DEFAULT` when unset
    pub qualifier: Option<String>,
    pub format: OutputFormat,
    /// Overwrite an existing definition file
    pub force: bool,
    /// Directory the definition file is written into
    pub directory: PathBuf,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            qualifier: None,
            format: OutputFormat::Json,
            force: false,
            directory: PathBuf::from("."),
        }
    }
}

/// Write a definition file from a runtime that already exists remotely
///
/// Returns the written path, or `None` when an existing file was kept.
pub async fn handle(app: &App, options: &InitOptions) -> Result<Option<PathBuf>> {
    let qualifier = match options.qualifier.as_deref() {
        Some(q) if !q.is_empty() => q,
        _ => DEFAULT_ENDPOINT_NAME,
    };
    tracing::debug!(name = %options.name, qualifier = %qualifier, "starting init");

    let remote = app
        .get_remote(&options.name, Some(qualifier))
        .await
        .context(format!("get agent runtime {}", options.name))?;
    tracing::info!(name = %options.name, arn = %remote.arn, "fetched agent runtime");

    let definition = codec::decode_remote(&remote).context("decode remote agent runtime")?;
    let json = codec::encode(&definition)?;
    let mut document = format_document(app, json, options.format).context("format document")?;
    if !document.ends_with(b"\n") {
        document.push(b'\n');
    }

    let path = options.directory.join(options.format.filename());
    if !options.force && tokio::fs::try_exists(&path).await? {
        tracing::warn!(file = %path.display(), "file already exists, use force to overwrite");
        return Ok(None);
    }

    tracing::info!(file = %path.display(), "creating agent runtime file");
    tokio::fs::write(&path, &document)
        .await
        .map_err(acrun_cloud::CloudError::from)
        .context(format!("write file {}", path.display()))?;
    Ok(Some(path))
}
