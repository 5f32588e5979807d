use testermatching::{build_rocket, Config};
use tracing::{error, info};

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting testermatching v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let rocket = match build_rocket(&config) {
        Ok(rocket) => rocket,
        Err(e) => {
            error!("Failed to initialize: {}", e);
            return Err(e.into());
        }
    };

    rocket.launch().await?;
    Ok(())
}
