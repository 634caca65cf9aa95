//! Stock ledger HTTP server over in-memory backends.

use stock_ledger::{InMemoryLedger, LedgerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = LedgerConfig::load()?;
    let addr = config.bind_addr.clone();
    let ledger = InMemoryLedger::new(config).ledger;

    stock_ledger::http::serve(ledger, &addr).await?;
    Ok(())
}
