use std::time::Duration;

use trogon_llm::RouterConfig;
use trogon_query_tool::{StoreConfig, StoreError};
use trogon_std::env::{ReadEnv, parse_var_or};
use trogon_vault::{VaultConfig, VaultError};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_MAX_TOOL_STEPS: usize = 5;
const DEFAULT_APPROVAL_TIMEOUT_SECS: u64 = 300;

/// Startup failures. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("document store: {0}")]
    Store(#[from] StoreError),

    #[error("{var}: {reason}")]
    Invalid { var: &'static str, reason: &'static str },
}

/// Agent runtime settings.
///
/// Resolved from environment variables:
/// - `SANDBOX_PORT`: HTTP listen port (default 8080)
/// - `SANDBOX_MAX_TOOL_STEPS`: model round trips per request (default 5)
/// - `SANDBOX_APPROVAL_TIMEOUT_SECS`: how long a tool call waits for a human
///   before it is denied (default 300)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    pub port: u16,
    pub max_tool_steps: usize,
    pub approval_timeout: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            max_tool_steps: DEFAULT_MAX_TOOL_STEPS,
            approval_timeout: Duration::from_secs(DEFAULT_APPROVAL_TIMEOUT_SECS),
        }
    }
}

impl SandboxConfig {
    pub fn from_env<E: ReadEnv>(env: &E) -> Result<Self, ConfigError> {
        let max_tool_steps = parse_var_or(env, "SANDBOX_MAX_TOOL_STEPS", DEFAULT_MAX_TOOL_STEPS);
        if max_tool_steps == 0 {
            return Err(ConfigError::Invalid {
                var: "SANDBOX_MAX_TOOL_STEPS",
                reason: "must be at least 1",
            });
        }
        Ok(Self {
            port: parse_var_or(env, "SANDBOX_PORT", DEFAULT_PORT),
            max_tool_steps,
            approval_timeout: Duration::from_secs(parse_var_or(
                env,
                "SANDBOX_APPROVAL_TIMEOUT_SECS",
                DEFAULT_APPROVAL_TIMEOUT_SECS,
            )),
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_max_tool_steps(mut self, steps: usize) -> Self {
        self.max_tool_steps = steps;
        self
    }

    pub fn with_approval_timeout(mut self, timeout: Duration) -> Self {
        self.approval_timeout = timeout;
        self
    }
}

/// Everything the binary needs, read once at startup.
#[derive(Debug)]
pub struct AppConfig {
    pub sandbox: SandboxConfig,
    pub vault: VaultConfig,
    pub store: StoreConfig,
    pub router: RouterConfig,
}

impl AppConfig {
    pub fn from_env<E: ReadEnv>(env: &E) -> Result<Self, ConfigError> {
        Ok(Self {
            sandbox: SandboxConfig::from_env(env)?,
            vault: VaultConfig::from_env(env)?,
            store: StoreConfig::from_env(env)?,
            router: RouterConfig::from_env(env),
        })
    }
}
