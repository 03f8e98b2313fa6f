use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use log::*;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub use self::error::{Error, Result};
pub use service::AppState;

mod controller;
mod error;
mod params;
pub mod router;
mod sse;
mod websocket;

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let host = app_state.config.interface().to_string();
    let port = app_state.config.port;
    let server_url = format!("{host}:{port}");

    let allowed_origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Skipping unparseable CORS origin: {origin}");
                None
            }
        })
        .collect();

    info!("Allowed CORS origins: {:?}", app_state.config.allowed_origins);

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(allowed_origins);

    let router = router::define_routes(app_state).layer(cors_layer);

    info!("Server starting... listening for connections on http://{server_url}");

    let listener = TcpListener::bind((host.as_str(), port)).await?;
    axum::serve(listener, router).await
}

#[cfg(test)]
pub(crate) mod test_support {
    use clap::Parser;
    use service::config::Config;
    use service::AppState;

    pub(crate) const STREAM: &str =
        "e08ab5d36c6b3e5ff2b7a4e0b0f4f1c7c3a9d3e5b2f6a8c1d4e7f0a3b6c9d2e3";

    pub(crate) fn test_config() -> Config {
        Config::try_parse_from(["generation_platform_rs"]).unwrap()
    }

    pub(crate) fn test_state(webhook_secret: Option<&str>) -> AppState {
        AppState::new(test_config().set_webhook_secret(webhook_secret.map(String::from)))
    }
}
