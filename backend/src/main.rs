use std::sync::Arc;

use axum::http::HeaderValue;
use anyhow::Context;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowMethods, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use orgmanager_backend::{
    api, auth::TokenDecoder, config, store::postgrest::PostgrestClient, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (dev convenience)
    let _ = dotenvy::dotenv();

    // Tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::Config::from_env()?;

    let store = PostgrestClient::new(&cfg.supabase_url, &cfg.supabase_anon_key)?;

    if cfg.jwt_secret.is_none() {
        tracing::warn!("SUPABASE_JWT_SECRET not set; tokens are decoded without verification");
    }
    if cfg.strict_auth {
        tracing::info!("Strict authentication enabled");
    }

    let state = AppState {
        store: Arc::new(store),
        tokens: TokenDecoder::new(cfg.jwt_secret.clone(), cfg.strict_auth),
    };

    // CORS: credentials are allowed, so methods and headers are mirrored
    // instead of using a wildcard.
    let origin = cfg
        .cors_origin
        .parse::<HeaderValue>()
        .context("CORS_ORIGIN must be a valid header value")?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let app = api::router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(CompressionLayer::new()),
    );

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!("Listening on {}", cfg.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
