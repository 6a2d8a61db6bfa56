use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use http::header::AUTHORIZATION;
use manifold_config::Config;
use manifold_core::RequestContext;
use manifold_llm::{AdapterRegistry, GatewayState, gateway_router};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

/// Gateway HTTP server
pub struct Server {
    config: Config,
}

impl Server {
    /// Create a server over a loaded configuration
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Serve until the shutdown token fires
    pub async fn serve(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let registry = AdapterRegistry::from_config(&self.config);
        tracing::info!(adapters = ?registry.names(), "registered adapters");

        let state = GatewayState::new(registry);
        let proxy = self.config.proxy.clone();

        let app = gateway_router(state).layer(axum::middleware::from_fn(move |request, next| {
            attach_context(proxy.clone(), request, next)
        }));

        let address = self.config.server.listen_address();
        let listener = tokio::net::TcpListener::bind(address).await?;
        tracing::info!(%address, "listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        Ok(())
    }
}

/// Build the per-request context from the `Authorization` header
///
/// The bearer token is carried opaquely; each adapter decides what it
/// means.
async fn attach_context(proxy: Option<String>, mut request: Request, next: Next) -> Response {
    let credential = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).to_owned())
        .filter(|value| !value.is_empty());

    let context = RequestContext {
        credential: credential.map(SecretString::from),
        proxy,
    };
    request.extensions_mut().insert(context);

    next.run(request).await
}
