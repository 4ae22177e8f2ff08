mod error;
mod summarize;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::app::AppState;

pub use error::{ApiError, INTERNAL_FAILURE};

pub fn router(state: AppState) -> Router {
    let body_limit = summarize::body_limit(state.max_input_chars);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/summarize", post(summarize::summarize_local))
        .route("/api/summarize/ollama", post(summarize::summarize_local))
        .route("/api/summarize/groq", post(summarize::summarize_hosted))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}
