mod deadlines;
mod llm;
mod logging;
mod memory;
mod server;
mod sessions;
mod store;
mod tools;

pub use deadlines::*;
pub use llm::*;
pub use logging::*;
pub use memory::*;
pub use server::*;
pub use sessions::*;
pub use store::*;
pub use tools::*;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub deadlines: DeadlinesConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Load from a TOML file, falling back to all-defaults if the file
    /// does not exist (matches the teacher's permissive `load_config`
    /// behavior — a missing config file is not fatal).
    pub fn load_from_str(raw: &str) -> crate::error::Result<Self> {
        toml::from_str(raw).map_err(|e| crate::error::Error::Config(e.to_string()))
    }

    /// Validate cross-field invariants, returning a list of issues.
    /// Startup aborts only on `Error`-severity issues (matches the
    /// teacher's `ConfigSeverity` / `config.validate()` pattern).
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.server.port == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "server.port must be nonzero".into(),
            });
        }
        if self.deadlines.llm_timeout_secs == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "deadlines.llm_timeout_secs must be nonzero".into(),
            });
        }
        if self.sessions.idle_limit_secs < 10 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "sessions.idle_limit_secs is very low; heartbeat reaping may be noisy"
                    .into(),
            });
        }
        if self.logging.truncate_bytes == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "logging.truncate_bytes is 0; tool output will never be logged".into(),
            });
        }

        issues
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
