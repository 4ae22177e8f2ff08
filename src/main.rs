use std::path::PathBuf;

use tokio::net::TcpListener;

use speedy_summary::api::router;
use speedy_summary::error::{AppError, Result};
use speedy_summary::{AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (info and above unless RUST_LOG says otherwise)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Check for --config flag
    let config_path = match args.iter().position(|a| a == "--config") {
        Some(i) => Some(PathBuf::from(args.get(i + 1).ok_or_else(|| {
            AppError::Config("--config requires a path".to_string())
        })?)),
        None => None,
    };

    // Check for --print-config flag (show effective settings and exit)
    let print_config = args.iter().any(|a| a == "--print-config");

    // Load configuration
    let config = Config::load(config_path.as_deref())?;

    if print_config {
        let mut shown = config.clone();
        if shown.groq_api_key.is_some() {
            shown.groq_api_key = Some("<redacted>".to_string());
        }
        if shown.supabase_anon_key.is_some() {
            shown.supabase_anon_key = Some("<redacted>".to_string());
        }
        let rendered =
            toml::to_string_pretty(&shown).map_err(|e| AppError::Config(e.to_string()))?;
        println!("{}", rendered);
        return Ok(());
    }

    let state = AppState::from_config(&config).await?;
    let app = router(state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
