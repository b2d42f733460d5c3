use crate::app::{App, KNOWN_AFTER_DEPLOY};
use crate::codec;
use crate::diff::{self, IgnoreQuery};
use acrun_cloud::{CloudError, Result, ResultExt};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    /// Endpoint name or version to compare against; `current` when unset
    pub qualifier: Option<String>,
    /// jq paths removed from both sides before comparing
    pub ignore: Option<String>,
    /// Fail with the diff exit code when differences exist
    pub exit_code: bool,
}

/// Compare the local definition with the remote state
///
/// Returns whether differences were found. With `exit_code` set, differences
/// surface as `CloudError::Exit` instead.
pub async fn handle(app: &App, options: &DiffOptions) -> Result<bool> {
    let local = app
        .load_definition()
        .await
        .context("load agent runtime file")?;
    let name = local.name();

    let remote = match app.get_remote(name, options.qualifier.as_deref()).await {
        Ok(remote) => Some(remote),
        Err(e) if e.is_not_found() => {
            tracing::info!(
                name = %name,
                "remote agent runtime not found, deploy will create a new agent runtime"
            );
            None
        }
        Err(e) => return Err(e).context("get remote agent runtime"),
    };

    let ignore = options
        .ignore
        .as_deref()
        .filter(|q| !q.is_empty())
        .map(IgnoreQuery::parse)
        .transpose()?;

    let (remote_label, remote_value) = match &remote {
        Some(remote) => {
            let definition = codec::decode_remote(remote).context("decode remote agent runtime")?;
            (
                format!("{};Version {}", remote.arn, remote.version),
                codec::encode_value(&definition)?,
            )
        }
        None => (format!("{};", KNOWN_AFTER_DEPLOY), Value::Null),
    };
    let local_label = app.definition_file()?.display().to_string();
    let local_value = codec::encode_value(&local)?;

    let changes = diff::diff(&remote_value, &local_value, ignore.as_ref());
    if changes.is_empty() {
        tracing::info!(name = %name, remote = %remote_label, local = %local_label, "no differences found");
        return Ok(false);
    }

    let text = diff::render(&changes, &remote_label, &local_label);
    let text = if app.color() { diff::colorize(&text) } else { text };
    app.write_output(text.as_bytes())?;

    if options.exit_code {
        return Err(CloudError::diff_found());
    }
    Ok(true)
}
