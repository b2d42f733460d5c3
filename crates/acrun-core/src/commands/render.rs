use super::{OutputFormat, format_document};
use crate::app::App;
use crate::codec;
use acrun_cloud::{Result, ResultExt};

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub format: OutputFormat,
}

/// Write the local definition as the tool reads it
///
/// Evaluation, validation and the codec round trip all run, so the output is
/// exactly what deploy would send.
pub async fn handle(app: &App, options: &RenderOptions) -> Result<()> {
    let definition = app
        .load_definition()
        .await
        .context("load agent runtime file")?;
    let json = codec::encode(&definition)?;
    let mut rendered = format_document(app, json, options.format).context("format document")?;
    if !rendered.ends_with(b"\n") {
        rendered.push(b'\n');
    }
    app.write_output(&rendered)
}
