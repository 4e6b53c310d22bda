//! OLX Watcher — Binary Entrypoint
//! Wires config, the seen-store, the browserless fetcher, and the Telegram
//! notifier, then hands off to the watch loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use olx_watcher::fetch::BrowserlessFetcher;
use olx_watcher::notify::TelegramNotifier;
use olx_watcher::store::SeenStore;
use olx_watcher::watch_config::WatcherConfig;
use olx_watcher::watcher;

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("olx_watcher=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = WatcherConfig::load_default().context("loading watcher config")?;

    if !cfg.metrics_addr.is_empty() {
        let addr: std::net::SocketAddr = cfg
            .metrics_addr
            .parse()
            .context("parsing metrics_addr")?;
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("installing prometheus exporter")?;
        tracing::info!(%addr, "prometheus exporter listening");
    }

    // A broken store is the one fatal startup condition: running without it
    // would re-report every ad currently on the pages.
    let store = Arc::new(SeenStore::open(&cfg.state_path).context("opening seen-store")?);
    tracing::info!(
        records = store.len(),
        path = %store.path().display(),
        "seen-store loaded"
    );

    let fetcher = Arc::new(BrowserlessFetcher::from_env());
    let notifier = Arc::new(TelegramNotifier::from_env());

    watcher::run(cfg, fetcher, notifier, store).await
}
