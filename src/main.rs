use actix_web::{middleware::Logger, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;

use lost_and_found::app::AppState;
use lost_and_found::config::Config;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().context("Failed to load configuration (SECRET_KEY is required in production)")?;

    let state = AppState::from_config(&config)
        .await
        .context("Failed to initialize storage")?;

    let bind_address = config.bind_address();
    log::info!(
        "Starting Lost & Found server on {} ({:?}, storage: {})",
        bind_address,
        config.environment,
        config.database_url
    );

    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(Logger::default())
            .configure(|cfg| state.configure(cfg))
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run()
    .await?;

    Ok(())
}
