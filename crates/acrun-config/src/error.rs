use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "agent runtime definition not found. Looked for:\n\
        - the --agent-runtime option or ACRUN_AGENT_RUNTIME environment variable\n\
        - agent_runtime.json, agent_runtime.jsonnet in the current directory"
    )]
    DefinitionNotFound,

    #[error("agent runtime definition {0} does not exist")]
    DefinitionMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
