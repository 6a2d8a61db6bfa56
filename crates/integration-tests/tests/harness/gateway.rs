//! Gateway instance bound to a random port for black-box tests

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use manifold_config::Config;
use manifold_core::RequestContext;
use manifold_llm::emulate::ToolExecutor;
use manifold_llm::{AdapterRegistry, GatewayState, gateway_router};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

/// A running gateway instance
pub struct TestGateway {
    addr: SocketAddr,
    shutdown: CancellationToken,
    client: reqwest::Client,
}

impl TestGateway {
    /// Start a gateway over the given configuration
    ///
    /// Binds to port 0 for automatic port assignment
    pub async fn start(config: Config) -> anyhow::Result<Self> {
        Self::start_inner(config, None).await
    }

    /// Start a gateway with a tool executor attached, for emulation tests
    pub async fn start_with_executor(config: Config, executor: Arc<dyn ToolExecutor>) -> anyhow::Result<Self> {
        Self::start_inner(config, Some(executor)).await
    }

    async fn start_inner(config: Config, executor: Option<Arc<dyn ToolExecutor>>) -> anyhow::Result<Self> {
        let registry = AdapterRegistry::from_config(&config);

        let mut state = GatewayState::new(registry);
        if let Some(executor) = executor {
            state = state.with_tool_executor(executor);
        }

        let proxy = config.proxy.clone();
        let app = gateway_router(state).layer(axum::middleware::from_fn(move |request, next| {
            attach_context(proxy.clone(), request, next)
        }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        let client = reqwest::Client::new();

        Ok(Self { addr, shutdown, client })
    }

    /// URL of a gateway endpoint
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Get a reference to the HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Bearer-token middleware matching the production binary
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
