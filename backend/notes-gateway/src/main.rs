use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;

use notes_gateway::config::Config;
use notes_gateway::routes;
use notes_gateway::store::InMemoryNoteStore;
use notes_gateway::Gateway;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Structured JSON logging for log aggregation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,notes_gateway=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    info!("Starting notes gateway...");

    // A missing or empty JWT_SECRET aborts startup here
    let config = Config::from_env().context("Failed to load configuration")?;

    let store = Arc::new(InMemoryNoteStore::new());
    let gateway = web::Data::new(
        Gateway::from_config(&config, store).context("Failed to initialize gateway")?,
    );

    info!(
        max_depth = config.graphql.max_depth,
        max_complexity = config.graphql.max_complexity,
        "Query guard enabled"
    );

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let playground = config.graphql.playground;
    info!("Notes gateway starting on http://{}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(gateway.clone())
            .configure(|cfg| routes::configure(cfg, playground))
    })
    .workers(config.server.workers)
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await
    .context("HTTP server terminated with an error")
}
