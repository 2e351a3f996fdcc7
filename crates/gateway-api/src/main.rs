//! # Payment Gateway
//!
//! HTTP front for the Paystack, Seerbit and Klasha adapters.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables (or provide config/payment-gateways.toml)
//! export PAYMENT_GATEWAY_SIGNING_KEY=change-me-to-something-long
//! export PAYSTACK_SECRET_KEY=sk_test_...
//! export SEERBIT_SECRET_KEY=...
//! export SEERBIT_PUBLIC_KEY=...
//!
//! # Run the server
//! payment-gateway
//! ```

use gateway_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging; LOG_FORMAT=json for structured output
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let (json_layer, text_layer) = if json_logs {
        (Some(fmt::layer().json()), None)
    } else {
        (None, Some(fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(json_layer)
        .with(text_layer)
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment providers: {:?}", state.registry.providers());
    info!(
        "Configured providers: {:?}",
        state.settings().providers.keys().collect::<Vec<_>>()
    );
    if state.settings().debug {
        info!("Debug mode: raw provider traffic is logged under payment_gateways::debug");
    }

    state.spawn_session_sweeper();

    let app = routes::create_router(state);

    info!("Payment gateway starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Sessions: POST http://{}/api/v1/{{provider}}/sessions", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  payment-gateways-rs
  ━━━━━━━━━━━━━━━━━━━
  Paystack · Seerbit · Klasha
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
