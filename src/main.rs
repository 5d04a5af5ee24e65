use feast_server::{Config, Server, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    setup_environment(&config)?;

    print_banner();
    tracing::info!(
        "Feast Server starting... (environment: {})",
        config.environment
    );

    Server::new(config).run().await
}
