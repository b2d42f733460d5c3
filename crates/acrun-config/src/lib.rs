pub mod error;
pub mod logging;

pub use error::*;
pub use logging::{LogFormat, LogLevel, LogOptions};

use std::path::{Path, PathBuf};

/// Environment variable naming the definition file directly
pub const DEFINITION_ENV: &str = "ACRUN_AGENT_RUNTIME";

/// File names searched in the working directory, in priority order
pub const DEFINITION_CANDIDATES: [&str; 2] = ["agent_runtime.json", "agent_runtime.jsonnet"];

/// Options shared by every command
#[derive(Debug, Clone, clap::Args)]
pub struct GlobalOptions {
    /// Agent runtime definition file
    #[arg(long, env = "ACRUN_AGENT_RUNTIME")]
    pub agent_runtime: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "ACRUN_LOG_LEVEL", value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, env = "ACRUN_LOG_FORMAT", value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Colored output
    #[arg(long, env = "ACRUN_COLOR", default_value_t = true, action = clap::ArgAction::Set)]
    pub color: bool,

    /// Dump request payloads before mutating calls
    #[arg(short, long)]
    pub verbose: bool,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            agent_runtime: None,
            log_level: LogLevel::Info,
            log_format: LogFormat::Text,
            color: true,
            verbose: false,
        }
    }
}

impl GlobalOptions {
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            level: self.log_level,
            format: self.log_format,
            color: self.color,
        }
    }

    /// Resolve the definition file these options point at
    pub fn definition_file(&self) -> Result<PathBuf> {
        find_definition_file(self.agent_runtime.as_deref())
    }
}

/// Locate the agent runtime definition file
///
/// Search order:
/// 1. the explicit path, which must exist
/// 2. the `ACRUN_AGENT_RUNTIME` environment variable
/// 3. `agent_runtime.json`, `agent_runtime.jsonnet` in the current directory
pub fn find_definition_file(explicit: Option<&Path>) -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    find_definition_file_in(&current_dir, explicit)
}

/// Same as [`find_definition_file`], searching `dir` instead of the working directory
pub fn find_definition_file_in(dir: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(ConfigError::DefinitionMissing(path.to_path_buf()));
    }

    if let Ok(env_path) = std::env::var(DEFINITION_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::debug!(path = %path.display(), "{} points at a missing file", DEFINITION_ENV);
    }

    for filename in DEFINITION_CANDIDATES {
        let path = dir.join(filename);
        if path.exists() {
            tracing::debug!(file = %path.display(), "found agent runtime file");
            return Ok(path);
        }
    }

    Err(ConfigError::DefinitionNotFound)
}
