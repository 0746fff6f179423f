use clap::Parser;
use server::ServeCommand;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod server;

/// Used when `RUST_LOG` is unset or does not parse.
const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug,sqlx=warn";

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(log_filter())
        .init();

    ServeCommand::parse().run().await
}
