//! Rail gateway binary
//!
//! Hosts the ledger of one domain: loads configuration, bootstraps the
//! domain and keeps its actor running until ctrl-c. The binary opens no
//! network ingress. Submissions and inbound deliveries reach the ledger
//! through [`gateway::LedgerHandle`] in the embedding process, and
//! cross-domain delivery between in-process domains is done by
//! [`gateway::Relay`]. Routed messages left in the outbox at shutdown are
//! reported in the final log line.

use anyhow::Context;
use gateway::{spawn_ledger_actor, Config, Ledger, Metrics};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::var("GATEWAY_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::from_env().context("loading configuration from environment")?,
    };

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .context("invalid log filter")?;
    if config.logging.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        domain = config.domain,
        "Starting DelTran rail gateway"
    );

    let (ledger, outbox) = Ledger::bootstrap(&config)?;
    let identities = *ledger.identities();
    tracing::info!(
        admin = %identities.admin,
        relay = %identities.relay,
        router = %identities.router,
        "ledger bootstrapped"
    );

    let metrics = Metrics::new()?;
    let handle = spawn_ledger_actor(ledger, metrics, config.actor.mailbox_capacity);

    tracing::info!(
        domain = %handle.domain(),
        "ledger actor running, no network ingress is opened by this binary"
    );
    tokio::signal::ctrl_c().await?;

    tracing::info!(pending_deliveries = outbox.len(), "Shutting down rail gateway");
    handle.shutdown().await?;
    tracing::debug!(metrics = %handle.metrics().gather_text()?, "final metrics");
    Ok(())
}
