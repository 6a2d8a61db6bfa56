use secrecy::{ExposeSecret, SecretString};

/// Runtime context for one gateway request
///
/// Built by the server layer from the incoming request and shared,
/// immutably, with every adapter call made on its behalf. Adapters must not
/// retain it across requests. Cancellation rides the request task: dropping
/// the handler future aborts any in-flight upstream call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Opaque credential token taken from the `Authorization` header
    ///
    /// Interpreted per adapter; for most it is the upstream API key, for
    /// image generation it also selects the backend space.
    pub credential: Option<SecretString>,
    /// Outbound proxy URL for upstream calls, if configured
    pub proxy: Option<String>,
}

impl RequestContext {
    /// Context with no credential and no proxy, for embedded and test use
    pub const fn empty() -> Self {
        Self {
            credential: None,
            proxy: None,
        }
    }

    /// Context carrying only a credential token
    pub fn with_credential(token: impl Into<String>) -> Self {
        Self {
            credential: Some(SecretString::from(token.into())),
            proxy: None,
        }
    }

    /// The credential token as a plain string, if present
    pub fn credential_str(&self) -> Option<&str> {
        self.credential.as_ref().map(ExposeSecret::expose_secret)
    }
}
