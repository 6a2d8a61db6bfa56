use std::net::SocketAddr;

use serde::Deserialize;

/// HTTP server configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the gateway listens on; defaults to `0.0.0.0:8080`
    pub listen_address: Option<SocketAddr>,
}

impl ServerConfig {
    /// Listen address, falling back to the default
    pub fn listen_address(&self) -> SocketAddr {
        self.listen_address
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)))
    }
}
