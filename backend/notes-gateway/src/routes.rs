//! HTTP routes

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};
use tracing::error;

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::metrics;

pub async fn graphql_handler(
    gateway: web::Data<Gateway>,
    http_request: HttpRequest,
    request: GraphQLRequest,
) -> Result<GraphQLResponse, GatewayError> {
    // A header that is present but not valid text is a bad credential, not an absent one
    let auth_header = http_request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str())
        .transpose()
        .map_err(|_| GatewayError::SessionInvalid)?;

    let response = gateway.execute(auth_header, request.into_inner()).await?;
    Ok(response.into())
}

async fn health_handler() -> &'static str {
    "ok"
}

/// SDL (Schema Definition Language) endpoint
async fn schema_handler(gateway: web::Data<Gateway>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain")
        .body(gateway.schema().sdl())
}

async fn metrics_handler() -> HttpResponse {
    match metrics::render() {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(body),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}

async fn playground_handler() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html")
        .body(
            async_graphql::http::GraphiQLSource::build()
                .endpoint("/graphql")
                .finish(),
        )
}

/// Register gateway routes; the playground is only mounted when enabled
pub fn configure(cfg: &mut web::ServiceConfig, playground: bool) {
    cfg.route("/graphql", web::post().to(graphql_handler))
        .route("/graphql/schema", web::get().to(schema_handler))
        .route("/schema", web::get().to(schema_handler))
        .route("/health", web::get().to(health_handler))
        .route("/metrics", web::get().to(metrics_handler));

    if playground {
        cfg.route("/playground", web::get().to(playground_handler));
    }
}
