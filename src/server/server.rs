//! HTTP server core implementation

use crate::config::{Config, ServerConfig};
use crate::server::middleware::{AdmissionMiddleware, TelemetryMiddleware};
use crate::server::routes;
use crate::server::state::AppState;
use crate::utils::error::{GuardError, Result};
use actix_web::{App, HttpServer as ActixHttpServer, middleware::DefaultHeaders, web};
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

/// HTTP server
pub struct HttpServer {
    /// Server configuration
    config: ServerConfig,
    /// Application state
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server
    pub async fn new(config: &Config) -> Result<Self> {
        info!("Creating HTTP server");
        let state = AppState::new(config.clone()).await?;
        Ok(Self::with_state(state))
    }

    /// Create a server around already built state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config.server.clone(),
            state,
        }
    }

    /// Create the Actix-web application
    ///
    /// Telemetry wraps admission so rejected requests are timed and logged
    /// like any other response.
    pub fn create_app(
        state: web::Data<AppState>,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let admin_enabled = state.config.server.admin_token.is_some();

        App::new()
            .app_data(state)
            .wrap(AdmissionMiddleware)
            .wrap(TelemetryMiddleware)
            .wrap(TracingLogger::default())
            .wrap(DefaultHeaders::new().add(("Server", "adele-guard")))
            .configure(move |cfg| routes::configure_routes(cfg, admin_enabled))
    }

    /// Start the HTTP server and run until it is stopped
    pub async fn start(self) -> Result<()> {
        let bind_addr = self.config.bind_addr();
        info!("Starting HTTP server on {}", bind_addr);

        let state = web::Data::new(self.state.clone());
        let mut server = ActixHttpServer::new(move || Self::create_app(state.clone()));
        if let Some(workers) = self.config.workers {
            server = server.workers(workers);
        }

        let server = server
            .bind(&bind_addr)
            .map_err(|e| GuardError::config(format!("Failed to bind {}: {}", bind_addr, e)))?
            .run();

        info!("HTTP server listening on {}", bind_addr);
        let served = server
            .await
            .map_err(|e| GuardError::internal(format!("Server error: {}", e)));

        if let Err(e) = self.state.shutdown().await {
            warn!(error = %e, "Observability shutdown failed");
        }
        info!("HTTP server stopped");
        served
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}
