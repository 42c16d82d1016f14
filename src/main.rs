//! Bella - dataset-first chat companion

use bella_chat::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // WARN level by default, use RUST_LOG=info for more
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into())
        )
        .init();

    cli::run().await
}
