mod commands;
mod config;
mod endpoints;
mod error;
mod middleware;
mod models;
mod queries;
mod requests;
mod services;

use crate::config::AppConfig;
use actix_web::middleware::{Logger, NormalizePath, TrailingSlash};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env()?;
    let store = services::open_store(&config)?;

    std::fs::create_dir_all(&config.upload.dir).with_context(|| {
        format!(
            "Failed to create upload directory {}",
            config.upload.dir.display()
        )
    })?;

    let address = (config.host.clone(), config.port);
    let config = Data::new(config);
    let store = Data::from(store);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(NormalizePath::new(TrailingSlash::Trim))
            .wrap(Logger::default())
            .app_data(config.clone())
            .app_data(store.clone())
            .configure(endpoints::products::configure)
    })
    .bind(&address)
    .with_context(|| format!("Failed to bind {}:{}", address.0, address.1))?
    .run();

    log::info!("Listening on {}:{}", address.0, address.1);
    server.await?;

    Ok(())
}
