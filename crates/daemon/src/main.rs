//! berthd: the berth host daemon.

use berth_daemon::providers::{MockProvider, ProviderRegistry};
use berth_daemon::{lifecycle, Config};
use berth_store::DbLayout;
use std::sync::Arc;
use tracing::{error, info};

fn main() {
    let root = std::env::args()
        .nth(1)
        .map(std::path::PathBuf::from)
        .unwrap_or_else(Config::default_root);

    init_logging(&DbLayout::new(&root));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("berthd: failed to start runtime: {e}");
            std::process::exit(1);
        }
    };

    let code = runtime.block_on(async {
        let config = match Config::load(&root) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("berthd: {e}");
                return 1;
            }
        };

        // Concrete LLM adapters register here at boot; the deterministic
        // mock ships so a fresh install can smoke-test the loop.
        let mut providers = ProviderRegistry::new();
        providers.register(Arc::new(MockProvider));

        match lifecycle::startup(config, providers).await {
            Ok(daemon) => {
                info!(root = %root.display(), "berthd ready");
                lifecycle::run(daemon).await;
                0
            }
            Err(e) => {
                error!(error = %e, "startup failed");
                eprintln!("berthd: {e}");
                1
            }
        }
    });
    std::process::exit(code);
}

fn init_logging(layout: &DbLayout) {
    let _ = std::fs::create_dir_all(layout.logs_dir());
    let appender = tracing_appender::rolling::never(layout.logs_dir(), "daemon.log");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(appender)
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
