//! Agent sandbox binary.
//!
//! # Environment variables
//!
//! | Variable                        | Default        | Description                            |
//! |---------------------------------|----------------|----------------------------------------|
//! | `ENCRYPTION_KEY`                | required       | 64 hex chars, seals stored API keys    |
//! | `CREDENTIAL_PROVIDERS`          | `anthropic`    | Providers tenants may store keys for   |
//! | `MONGODB_URI`                   | required       | Database the query tool reads          |
//! | `MONGODB_MAX_POOL_SIZE`         | `10`           | Connection pool ceiling                |
//! | `SANDBOX_PORT`                  | `8080`         | TCP port to listen on                  |
//! | `SANDBOX_MAX_TOOL_STEPS`        | `5`            | Model round trips per request          |
//! | `SANDBOX_APPROVAL_TIMEOUT_SECS` | `300`          | Undecided tool calls are then denied   |
//! | `RUST_LOG`                      | `info`         | Log filter (tracing-subscriber)        |

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use trogon_agent_sandbox::{AppConfig, AppState, PendingApprovals, Sandbox, router};
use trogon_llm::ModelRouter;
use trogon_query_tool::{MongoStore, QueryExecutor};
use trogon_std::env::SystemEnv;
use trogon_vault::{CredentialVault, MemoryCredentialStore};

#[derive(Parser, Debug)]
#[command(name = "trogon-agent-sandbox", about = "Tenant-scoped agent runtime")]
struct Args {
    /// Overrides SANDBOX_PORT.
    #[arg(long)]
    port: Option<u16>,

    /// Bind address.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let AppConfig {
        sandbox: mut config,
        vault: vault_config,
        store: store_config,
        router: router_config,
    } = AppConfig::from_env(&SystemEnv)?;
    if let Some(port) = args.port {
        config = config.with_port(port);
    }

    let store = MongoStore::connect(&store_config).await?;
    if let Err(err) = store.ping().await {
        tracing::warn!(error = %err, "Document store not reachable yet, queries will fail until it is");
    }

    let http = reqwest::Client::builder()
        .user_agent(concat!("trogon-agent-sandbox/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let sandbox = Sandbox::new(
        CredentialVault::from_config(&vault_config, MemoryCredentialStore::new()),
        ModelRouter::new(router_config, http),
        QueryExecutor::new(store),
    )
    .with_max_tool_steps(config.max_tool_steps);

    let state = AppState {
        sandbox: Arc::new(sandbox),
        approvals: Arc::new(PendingApprovals::new(config.approval_timeout)),
    };

    let addr = format!("{}:{}", args.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %addr,
        database = %state.sandbox.executor().store().database_name(),
        storable_providers = ?vault_config.policy.storable,
        max_tool_steps = config.max_tool_steps,
        "Agent sandbox listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutdown signal received");
    }
}
