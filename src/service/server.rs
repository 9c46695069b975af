//! # HTTP Server
//!
//! Combines the route groups into one router and runs it.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::observability::Logger;

use super::activation_routes::activation_routes;
use super::cleaner_routes::cleaner_routes;
use super::code_routes::code_routes;
use super::state::AppState;
use super::user_routes::user_routes;

/// The exifwash HTTP server
pub struct ApiServer {
    state: Arc<AppState>,
    router: Router,
}

impl ApiServer {
    pub fn new(state: Arc<AppState>) -> Self {
        let router = build_router(state.clone());
        Self { state, router }
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process ends
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr = self.state.config.bind_addr();

        let listener = TcpListener::bind(addr).await?;
        Logger::info("server listening", &[("addr", &addr.to_string())]);

        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .merge(cleaner_routes(state.clone()))
        .merge(user_routes(state.clone()))
        .merge(code_routes(state.clone()))
        .merge(activation_routes(state))
        .layer(cors)
}

/// CORS from config. No configured origins means a permissive layer
/// for development; listed origins lock it down.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = origins.iter().filter_map(|s| s.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use tempfile::TempDir;

    #[test]
    fn test_router_builds() {
        let dir = TempDir::new().unwrap();
        let config = ServiceConfig::sample(dir.path().to_path_buf());
        let state = AppState::build(config).unwrap();
        let _ = build_router(state);
    }

    #[test]
    fn test_cors_layer_accepts_origin_lists() {
        let _ = cors_layer(&[]);
        let _ = cors_layer(&["http://localhost:3000".to_string()]);
    }
}
