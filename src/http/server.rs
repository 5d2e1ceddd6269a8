//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with admin routes and the proxy fallback
//! - Wire up middleware (request ID, tracing, timeout, concurrency and body limits)
//! - Bind server to listener (plain or TLS) with graceful shutdown
//! - Drive the dispatch state machine for proxied requests
//! - Observability (metrics, correlation IDs)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::auth::{self, Authenticator};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::{forward, Dispatcher, ForwardContext, Forwarder};
use crate::http::request::{self, propagate_request_id_layer, set_request_id_layer};
use crate::lifecycle::startup::{self, StartupError};
use crate::observability::metrics;
use crate::rbac::RbacEngine;
use crate::registry::ApplicationRegistry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ApplicationRegistry>,
    pub rbac: Arc<RbacEngine>,
    pub dispatcher: Arc<Dispatcher>,
    pub forwarder: Arc<Forwarder>,
    pub authenticator: Arc<dyn Authenticator>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Build the stores from configuration, seed them and assemble the router.
    pub async fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let state = startup::build_state(&config).await?;
        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .merge(admin::setup_admin_router(state.clone(), config.security.max_body_size))
            .fallback(proxy_handler)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, mount_path = %self.config.gateway.mount_path, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server behind TLS.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let signal = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received");
            signal.graceful_shutdown(Some(Duration::from_secs(10)));
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// Proxy handler: every path not owned by the admin API.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request::request_id(request.headers());
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let Some(relative) = state.dispatcher.mounted(&path).map(str::to_owned) else {
        metrics::record_request(method.as_str(), 404, "none", start_time);
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };

    tracing::debug!(request_id = %request_id, method = %method, path = %path, "Dispatching request");

    let mut prefix = String::from("none");
    let response = match dispatch(&state, &request_id, &relative, &mut prefix, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                path = %path,
                status = e.status().as_u16(),
                kind = e.kind(),
                error = %e,
                "Request rejected"
            );
            e.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), &prefix, start_time);
    response
}

/// Resolve, authenticate, authorize and forward. `prefix` is set once the
/// application is resolved so metrics are labelled by known prefixes only.
async fn dispatch(
    state: &AppState,
    request_id: &str,
    path: &str,
    prefix: &mut String,
    request: Request<Body>,
) -> Result<Response, GatewayError> {
    let identity = auth::identify(state.authenticator.as_ref(), request.headers());

    let resolved = match (state.dispatcher.resolve(path).await, &identity) {
        (Ok(resolved), _) => resolved,
        // Without a credential only anonymous routes can proceed.
        (Err(_), Err(unauthenticated)) => return Err(unauthenticated.clone()),
        (Err(unresolved), Ok(_)) => return Err(unresolved),
    };
    prefix.clone_from(&resolved.prefix);

    let identity = if resolved.is_anonymous() {
        tracing::debug!(
            request_id = %request_id,
            prefix = %resolved.prefix,
            sub_path = %resolved.sub_path,
            "Anonymous route"
        );
        identity.ok()
    } else {
        let identity = identity?;
        state.dispatcher.authorize(&resolved, &identity, request.method())?;
        Some(identity)
    };

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let target = forward::target_uri(&resolved.host, &resolved.sub_path, request.uri().query())?;

    state
        .forwarder
        .forward(
            request,
            target,
            ForwardContext {
                request_id,
                peer,
                resolved: &resolved,
                identity: identity.as_ref(),
            },
        )
        .await
}
