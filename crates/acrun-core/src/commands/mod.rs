//! Command workflows
//!
//! One module per command. Each exposes an options record and an async
//! `handle` taking the shared [`App`](crate::app::App).

pub mod delete;
pub mod deploy;
pub mod diff;
pub mod images;
pub mod init;
pub mod invoke;
pub mod render;
pub mod rollback;

use crate::app::App;
use acrun_cloud::Result;

/// Document format of a definition file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Jsonnet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Jsonnet => "jsonnet",
        }
    }

    /// Default definition file name for this format
    pub fn filename(&self) -> String {
        format!("agent_runtime.{}", self.extension())
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = acrun_cloud::CloudError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "jsonnet" => Ok(OutputFormat::Jsonnet),
            other => Err(acrun_cloud::CloudError::Validation(format!(
                "unsupported format: {}",
                other
            ))),
        }
    }
}

/// Pretty JSON converted into `format`
pub(crate) fn format_document(app: &App, json: Vec<u8>, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Json => Ok(json),
        OutputFormat::Jsonnet => app.template_engine()?.format(&json, &format.filename()),
    }
}
