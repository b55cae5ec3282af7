//! Startup sequence errors. None of these stop the supervision loop; they are
//! logged and the next cycle tries again.

use crate::config::ConfigError;

#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error("configuration unavailable: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to spawn shell '{shell}': {source}")]
    Spawn {
        shell: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to pass launch command to shell '{shell}': {source}")]
    Stdin {
        shell: String,
        #[source]
        source: std::io::Error,
    },
}

impl StartupError {
    /// Short machine-readable code for log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Spawn { .. } => "SPAWN",
            Self::Stdin { .. } => "STDIN",
        }
    }
}
